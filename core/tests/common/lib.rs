use async_trait::async_trait;
use parking_lot::Mutex;
use selfheal_core::HtmlDocument;
use selfheal_core::Oracle;
use selfheal_core::OracleError;
use std::collections::HashMap;
use std::time::Duration;

/// Storefront page after a redesign: none of the ids the old automation
/// used are present any more.
pub const STORE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <div class="product" id="tshirt">
    <h2>T-Shirt</h2>
    <select id="tshirt-size-new">
      <option value="s">S</option><option value="m">M</option><option value="l">L</option>
    </select>
    <select id="tshirt-color-xyz">
      <option value="red">Red</option><option value="blue">Blue</option>
    </select>
    <button id="add-tshirt-button">Add to Cart</button>
  </div>
  <div class="product" id="jeans">
    <h2>Jeans</h2>
    <select id="jeans-size-v2"><option value="30">30</option></select>
    <select id="jeans-fit"><option value="slim">Slim</option></select>
    <button id="add-jeans-button">Add to Cart</button>
  </div>
  <ul id="cart-items"></ul>
</body>
</html>"#;

pub fn store_document() -> HtmlDocument {
    HtmlDocument::new(STORE_PAGE)
}

/// One recorded `query` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCall {
    pub stale_id: String,
    pub snapshot: String,
}

/// Scripted oracle that records every call it receives.
///
/// Ids without a scripted answer fail with `CallFailed`. `failing_first(n)`
/// makes the first `n` calls fail regardless of the id.
#[derive(Debug, Default)]
pub struct MockOracle {
    answers: HashMap<String, String>,
    delay: Duration,
    failures_remaining: Mutex<usize>,
    calls: Mutex<Vec<OracleCall>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, stale_id: &str, resolved_id: &str) -> Self {
        self.answers
            .insert(stale_id.to_string(), resolved_id.to_string());
        self
    }

    /// Sleeps before answering so that concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(self, failures: usize) -> Self {
        *self.failures_remaining.lock() = failures;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, stale_id: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.stale_id == stale_id)
            .count()
    }

    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn query(&self, stale_id: &str, snapshot: &str) -> Result<String, OracleError> {
        self.calls.lock().push(OracleCall {
            stale_id: stale_id.to_string(),
            snapshot: snapshot.to_string(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        {
            let mut remaining = self.failures_remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OracleError::CallFailed("scripted failure".to_string()));
            }
        }

        self.answers
            .get(stale_id)
            .cloned()
            .ok_or_else(|| OracleError::CallFailed(format!("no scripted answer for {stale_id}")))
    }
}
