//! In-memory remote for sync tests

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::remote::{NewPost, QuoteRemote, RemoteError, RemotePost, RemoteResult};
use crate::models::QuoteId;

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub posts: Vec<RemotePost>,
    pub fail_fetch: bool,
    pub reject_titles: HashSet<String>,
    pub fetch_delay: Option<Duration>,
    pub created: Mutex<Vec<NewPost>>,
}

impl FakeRemote {
    pub fn with_titles(titles: &[&str]) -> Self {
        Self {
            posts: titles
                .iter()
                .enumerate()
                .map(|(i, title)| RemotePost {
                    id: QuoteId::from(i as i64 + 1),
                    title: title.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.title.clone())
            .collect()
    }
}

#[async_trait]
impl QuoteRemote for FakeRemote {
    async fn fetch_posts(&self) -> RemoteResult<Vec<RemotePost>> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch {
            return Err(RemoteError::Status(503));
        }
        Ok(self.posts.clone())
    }

    async fn create_post(&self, post: &NewPost) -> RemoteResult<serde_json::Value> {
        if self.reject_titles.contains(&post.title) {
            return Err(RemoteError::Status(500));
        }
        self.created.lock().unwrap().push(post.clone());
        Ok(serde_json::json!({ "id": 101, "title": post.title }))
    }
}
