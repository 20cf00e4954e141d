//! Batch authorization review.
//!
//! Evaluates many `(url, method)` pairs for one caller. Pairs are independent
//! and evaluated concurrently; the result is keyed `url -> method -> result`.
use crate::auth::principal::Identity;
use crate::auth::rbac::authorize::Authorizer;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub url: String,
    pub method: String,
}

impl ReviewItem {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub allowed: bool,
    pub reason: String,
}

pub type ReviewResponse = HashMap<String, HashMap<String, ReviewResult>>;

#[derive(Clone)]
pub struct ReviewController {
    authorizer: Arc<Authorizer>,
}

impl ReviewController {
    pub fn new(authorizer: Arc<Authorizer>) -> Self {
        Self { authorizer }
    }

    pub async fn review(&self, caller: &Identity, items: &[ReviewItem]) -> ReviewResponse {
        let mut pending: FuturesUnordered<_> = items
            .iter()
            .map(|item| async move {
                let decision = self
                    .authorizer
                    .authorize_api(caller, &item.method, &item.url)
                    .await;
                (item, decision)
            })
            .collect();

        let mut response = ReviewResponse::new();
        while let Some((item, decision)) = pending.next().await {
            response.entry(item.url.clone()).or_default().insert(
                item.method.clone(),
                ReviewResult {
                    allowed: decision.allowed,
                    reason: decision.reason,
                },
            );
        }
        tracing::debug!(caller = caller.id, pairs = items.len(), "review evaluated");
        response
    }
}
