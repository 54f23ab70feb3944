use rand::distributions::Alphanumeric;
use rand::Rng;

const PREFIX: &str = "UYR";
const SUFFIX_LEN: usize = 6;

/// Short reference read out over the phone, e.g. `UYR4K7QZ2`.
pub fn booking_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("{}{}", PREFIX, suffix)
}
