use crate::db::models::PollOption;
use crate::error::AppError;
use rand::Rng;

const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 9;

pub const POLL_THEMES: [&str; 5] = ["default", "green", "purple", "orange", "red"];

/// Short opaque identifier. Uniqueness is probabilistic only.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_CHARSET[rng.gen_range(0..ID_CHARSET.len())] as char)
        .collect()
}

/// Recompute every option's share of the total, rounded half away from zero.
/// The results are independent and need not add up to 100.
pub fn calculate_percentages(options: &mut [PollOption]) {
    let total: u64 = options.iter().map(|opt| opt.votes).sum();

    for option in options.iter_mut() {
        option.percentage = if total == 0 {
            0
        } else {
            ((200 * option.votes + total) / (2 * total)) as u32
        };
    }
}

pub fn validate_string_length(
    value: &str,
    field_name: &str,
    min: usize,
    max: usize,
) -> Result<(), AppError> {
    let len = value.chars().count();

    if len < min {
        return Err(AppError::Validation(format!(
            "{field_name} must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "{field_name} must be no more than {max} characters long"
        )));
    }

    Ok(())
}

pub fn validate_wallet_address(address: &str) -> Result<(), AppError> {
    let valid = address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Invalid wallet address format".to_string(),
        ))
    }
}
