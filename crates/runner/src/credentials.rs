use qae_core::{Credentials, VenueId};

/// Credentials for `venue` from `<VENUE>_API_KEY`, `<VENUE>_API_SECRET` and
/// the optional `<VENUE>_PASSPHRASE`
///
/// Returns `None` unless both key and secret are set and non-empty.
pub fn credentials_for(
    venue: &VenueId,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<Credentials> {
    let prefix = venue.as_str().to_uppercase();
    let read = |suffix: &str| {
        lookup(&format!("{prefix}_{suffix}")).filter(|value| !value.trim().is_empty())
    };

    let credentials = Credentials::new(read("API_KEY")?, read("API_SECRET")?);
    Some(match read("PASSPHRASE") {
        Some(passphrase) => credentials.with_passphrase(passphrase),
        None => credentials,
    })
}

/// [`credentials_for`] backed by the process environment
pub fn credentials_from_env(venue: &VenueId) -> Option<Credentials> {
    credentials_for(venue, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_and_secret_required() {
        let vars = env(&[("BINANCE_API_KEY", "k")]);
        assert!(credentials_for(&VenueId::binance(), |n| vars.get(n).cloned()).is_none());

        let vars = env(&[("BINANCE_API_KEY", "k"), ("BINANCE_API_SECRET", "  ")]);
        assert!(credentials_for(&VenueId::binance(), |n| vars.get(n).cloned()).is_none());
    }

    #[test]
    fn test_passphrase_is_optional() {
        let vars = env(&[
            ("OKX_API_KEY", "k"),
            ("OKX_API_SECRET", "s"),
            ("OKX_PASSPHRASE", "p"),
            ("BYBIT_API_KEY", "k"),
            ("BYBIT_API_SECRET", "s"),
        ]);

        let okx = credentials_for(&VenueId::okx(), |n| vars.get(n).cloned()).unwrap();
        assert!(okx.has_passphrase());

        let bybit = credentials_for(&VenueId::bybit(), |n| vars.get(n).cloned()).unwrap();
        assert!(bybit.is_complete());
        assert!(!bybit.has_passphrase());
    }
}
