use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use common::{Error, ExchangeClient, Fill, Order, PriceSource, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// REST API client for Binance spot. Places MARKET orders and reads the
/// latest ticker price.
pub struct BinanceClient {
    api_key: String,
    secret: String,
    base_url: String,
    http: Client,
}

impl BinanceClient {
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            secret: secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn sign(&self, query: &str) -> Result<String> {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("invalid API secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn signed_post(&self, path: &str, params: &str) -> Result<String> {
        let ts = Utc::now().timestamp_millis();
        let query = format!("{params}&timestamp={ts}");
        let signature = self.sign(&query)?;
        let body = format!("{query}&signature={signature}");
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("POST {path}: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Transient(format!("POST {path}: {e}")))?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }
        Ok(text)
    }
}

/// Map a non-2xx response to the error taxonomy. Rate limits, IP bans and
/// server faults are retryable; every other 4xx is a refusal of the order.
fn classify_failure(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| format!("{} (code {})", e.msg, e.code))
        .unwrap_or_else(|_| body.to_string());

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 418
    {
        Error::Transient(format!("HTTP {status}: {detail}"))
    } else {
        Error::Rejected(format!("HTTP {status}: {detail}"))
    }
}

/// Binance rejects quantities with more precision than the lot size; eight
/// decimals is the maximum any spot symbol accepts.
fn format_quantity(quantity: f64) -> String {
    let s = format!("{quantity:.8}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Transient(format!("unparsable {field} '{raw}': {e}")))
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}&newOrderRespType=FULL",
            order.pair,
            order.side,
            format_quantity(order.quantity),
            order.id.replace('-', ""),
        );

        debug!(pair = %order.pair, side = %order.side, qty = order.quantity, "Submitting order to Binance");
        let body = self.signed_post("/api/v3/order", &params).await?;

        let resp: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Transient(format!("unparsable order response: {e}")))?;

        let executed = parse_decimal("executedQty", &resp.executed_qty)?;
        if executed <= 0.0 {
            return Err(Error::Rejected(format!(
                "order {} ended {} with no fill",
                resp.client_order_id, resp.status
            )));
        }

        // Quantity-weighted average over the individual fills.
        let mut notional = 0.0;
        let mut filled = 0.0;
        for f in &resp.fills {
            let price = parse_decimal("fill price", &f.price)?;
            let qty = parse_decimal("fill qty", &f.qty)?;
            notional += price * qty;
            filled += qty;
        }
        let fill_price = if filled > 0.0 {
            notional / filled
        } else {
            parse_decimal("cummulativeQuoteQty", &resp.cummulative_quote_qty)? / executed
        };

        Ok(Fill {
            order_id: resp.client_order_id,
            pair: order.pair.clone(),
            side: order.side,
            fill_price,
            quantity: executed,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/api/v3/ticker/price?symbol={symbol}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("GET ticker: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // A bad symbol is a 400 but still not an order rejection.
            return Err(Error::Transient(format!("ticker HTTP {status}: {body}")));
        }

        let ticker: PriceTicker = resp
            .json()
            .await
            .map_err(|e| Error::Transient(format!("unparsable ticker: {e}")))?;
        parse_decimal("price", &ticker.price)
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    client_order_id: String,
    #[serde(default)]
    status: String,
    executed_qty: String,
    #[serde(default = "zero")]
    cummulative_quote_qty: String,
    #[serde(default)]
    fills: Vec<FillDetail>,
}

fn zero() -> String {
    "0".to_string()
}

#[derive(Deserialize)]
struct FillDetail {
    price: String,
    qty: String,
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_trimmed() {
        assert_eq!(format_quantity(0.01), "0.01");
        assert_eq!(format_quantity(1.0), "1");
        assert_eq!(format_quantity(0.000123456789), "0.00012346");
    }

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        assert!(classify_failure(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(classify_failure(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(classify_failure(StatusCode::from_u16(418).unwrap(), "").is_transient());
    }

    #[test]
    fn client_errors_are_rejections_with_exchange_message() {
        let body = r#"{"code":-2010,"msg":"Account has insufficient balance for requested action."}"#;
        match classify_failure(StatusCode::BAD_REQUEST, body) {
            Error::Rejected(msg) => assert!(msg.contains("insufficient balance") && msg.contains("-2010")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn signature_is_hex_hmac_sha256() {
        // Example key/query pair from the Binance API documentation.
        let client = BinanceClient::new(
            "key",
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
            DEFAULT_BASE_URL,
        )
        .unwrap();
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            client.sign(query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }
}
