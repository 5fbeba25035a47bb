//! Private utility module
use rand::Rng;

/// Format a number as a DICOM decimal string (DS), 16 bytes at most.
///
/// The shortest round-trip form is used when it fits; otherwise the
/// precision is reduced in exponent notation until 16 bytes hold it.
pub fn fmt_ds(value: f64) -> String {
    let text = format!("{}", value);
    if text.len() <= 16 {
        return text;
    }
    for precision in (1..17).rev() {
        let text = format!("{:.*e}", precision, value);
        if text.len() <= 16 {
            return text;
        }
    }
    format!("{:.0e}", value)
}

/// Mint a random UID under the given root, 64 characters in total.
///
/// The root must end with a dot. The appended component never starts
/// with zero, keeping the identifier a valid UID.
pub fn rand_uid(root: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut uid = String::with_capacity(64);
    uid.push_str(root);
    uid.push(char::from(b'1' + rng.gen_range(0u8..9)));
    while uid.len() < 64 {
        uid.push(char::from(b'0' + rng.gen_range(0u8..10)));
    }
    uid
}

#[cfg(test)]
mod tests {
    use super::{fmt_ds, rand_uid};
    use crate::settings::UID_ROOT;

    #[test]
    fn short_values_format_plainly() {
        assert_eq!(fmt_ds(2.5), "2.5");
        assert_eq!(fmt_ds(-3.0), "-3");
        assert_eq!(fmt_ds(0.0), "0");
        assert_eq!(fmt_ds(32767.0), "32767");
    }

    #[test]
    fn long_values_fit_sixteen_bytes() {
        let cases = [7.0 / 32767.0, -1.0 / 3.0, 1.0e-300, 123456789.123456789];
        for value in cases {
            let text = fmt_ds(value);
            assert!(text.len() <= 16, "{} is too long", text);
            // precision loss stays small
            let parsed: f64 = text.parse().unwrap();
            let tolerance = (value.abs() * 1e-9).max(f64::MIN_POSITIVE);
            assert!((parsed - value).abs() <= tolerance, "{} vs {}", parsed, value);
        }
    }

    #[test]
    fn uids_are_rooted_and_sized() {
        let uid = rand_uid(UID_ROOT);
        assert_eq!(uid.len(), 64);
        assert!(uid.starts_with(UID_ROOT));
        assert!(uid[UID_ROOT.len()..].bytes().all(|b| b.is_ascii_digit()));
        assert_ne!(uid[..UID_ROOT.len() + 1].chars().last(), Some('0'));
    }

    #[test]
    fn uids_do_not_repeat() {
        assert_ne!(rand_uid(UID_ROOT), rand_uid(UID_ROOT));
    }
}
