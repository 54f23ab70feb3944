use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Service counters exposed on `/metrics`
pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub offers_issued: IntCounter,
    pub offer_accepts: IntCounterVec,
    pub offers_expired: IntCounter,
    pub ws_connections: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("uyir".to_string()), None)?;

        let bookings_created = IntCounter::new("bookings_created_total", "Bookings requested")?;
        let offers_issued = IntCounter::new("offers_issued_total", "Offers sent to ambulances")?;
        let offer_accepts = IntCounterVec::new(
            Opts::new("offer_accepts_total", "Offer accept attempts by outcome"),
            &["outcome"],
        )?;
        let offers_expired = IntCounter::new("offers_expired_total", "Offers closed by the expiry sweep")?;
        let ws_connections = IntGauge::new("ws_connections", "Open tracking connections")?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(offers_issued.clone()))?;
        registry.register(Box::new(offer_accepts.clone()))?;
        registry.register(Box::new(offers_expired.clone()))?;
        registry.register(Box::new(ws_connections.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            offers_issued,
            offer_accepts,
            offers_expired,
            ws_connections,
        })
    }

    pub fn record_accept(&self, outcome: &str) {
        self.offer_accepts.with_label_values(&[outcome]).inc();
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_prefixed_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.bookings_created.inc();
        metrics.record_accept("won");

        let text = metrics.render().unwrap();
        assert!(text.contains("uyir_bookings_created_total 1"));
        assert!(text.contains("uyir_offer_accepts_total{outcome=\"won\"} 1"));
    }
}
