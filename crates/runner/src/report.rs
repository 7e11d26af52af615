use qae_gateway::SessionHealth;

/// One-line status of a venue session for the periodic health log
pub fn health_line(health: &SessionHealth) -> String {
    let mut line = format!(
        "{} {} symbols={} retries={} private={}",
        health.venue,
        health.state,
        health.subscribed_symbol_count,
        health.retry_count,
        health.is_private_enabled,
    );

    if health.is_degraded() {
        line.push_str(&format!(
            " degraded(truncated={}, unlisted={})",
            health.coverage.truncated.len(),
            health.coverage.unlisted.len()
        ));
    }
    if let Some(error) = &health.last_error {
        line.push_str(&format!(" last_error={error:?}"));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use qae_core::{Symbol, VenueId};

    #[test]
    fn test_healthy_line() {
        let health = SessionHealth::new(VenueId::binance());
        assert_eq!(
            health_line(&health),
            "binance idle symbols=0 retries=0 private=false"
        );
    }

    #[test]
    fn test_degraded_line_includes_error() {
        let mut health = SessionHealth::new(VenueId::bybit());
        health.coverage.truncated = vec![Symbol::new("SOL/USDT")];
        health.last_error = Some("Connection closed by venue".into());
        health.retry_count = 3;

        let line = health_line(&health);

        assert!(line.contains("retries=3"));
        assert!(line.contains("degraded(truncated=1, unlisted=0)"));
        assert!(line.ends_with("last_error=\"Connection closed by venue\""));
    }
}
