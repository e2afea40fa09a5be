//! Static dashboard bundle served by the simulation server.

pub fn index_html() -> &'static str {
    include_str!("../static/index.html")
}

pub fn styles_css() -> &'static str {
    include_str!("../static/styles.css")
}

pub fn app_js() -> &'static str {
    include_str!("../static/app.js")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_bundle_contains_index_html() {
        let html = index_html();

        assert!(html.contains("<!doctype html>"));
        assert!(html.contains("/static/styles.css"));
        assert!(html.contains("/static/app.js"));
    }

    #[test]
    fn dashboard_contains_trading_panels() {
        let html = index_html();
        assert!(html.contains("price-chart"));
        assert!(html.contains("Open Positions"));
        assert!(html.contains("Transactions"));
        assert!(html.contains("data-action=\"open_long\""));
        assert!(html.contains("data-action=\"open_short\""));
    }

    #[test]
    fn script_speaks_the_api_protocol() {
        let js = app_js();
        assert!(js.contains("/ws/events"));
        assert!(js.contains("/api/commands"));
        assert!(js.contains("event_type"));
        assert!(js.contains("position_id"));
    }

    #[test]
    fn transaction_sides_are_coloured() {
        let js = app_js();
        assert!(js.contains(r#"cell(t.side, t.side === "Buy" ? "positive" : "negative")"#));
    }
}
