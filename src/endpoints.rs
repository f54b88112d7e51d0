//! Endpoint catalog
//!
//! Known paginated and streaming endpoints with their path templates and
//! published request quotas. Path templates use `:id` placeholders.

use crate::error::{Error, Result};
use crate::queue::{QueueConfig, DEFAULT_QUOTA_WINDOW};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const ID_PLACEHOLDER: &str = ":id";

/// A published request quota: `requests` per `window_secs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    DEFAULT_QUOTA_WINDOW.as_secs()
}

impl Quota {
    /// Quota over the standard 15 minute window
    pub const fn per_window(requests: u32) -> Self {
        Self {
            requests,
            window_secs: 15 * 60,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Spacing between requests that stays inside the quota
    pub fn rate(&self) -> Duration {
        self.window() / self.requests.max(1)
    }

    /// Queue configuration paced by this quota
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::from_quota(self.requests, self.window())
    }
}

/// Endpoints the client knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    UserFollowers,
    UserFollowing,
    UserTweets,
    UserMentions,
    UsersLookup,
    RecentSearch,
    FilterStream,
    SampleStream,
    FilterStreamRules,
}

impl Endpoint {
    pub const ALL: [Endpoint; 9] = [
        Endpoint::UserFollowers,
        Endpoint::UserFollowing,
        Endpoint::UserTweets,
        Endpoint::UserMentions,
        Endpoint::UsersLookup,
        Endpoint::RecentSearch,
        Endpoint::FilterStream,
        Endpoint::SampleStream,
        Endpoint::FilterStreamRules,
    ];

    /// Configuration key of this endpoint
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserFollowers => "user_followers",
            Self::UserFollowing => "user_following",
            Self::UserTweets => "user_tweets",
            Self::UserMentions => "user_mentions",
            Self::UsersLookup => "users_lookup",
            Self::RecentSearch => "recent_search",
            Self::FilterStream => "filter_stream",
            Self::SampleStream => "sample_stream",
            Self::FilterStreamRules => "filter_stream_rules",
        }
    }

    /// Path template relative to the API base URL
    pub fn template(&self) -> &'static str {
        match self {
            Self::UserFollowers => "/2/users/:id/followers",
            Self::UserFollowing => "/2/users/:id/following",
            Self::UserTweets => "/2/users/:id/tweets",
            Self::UserMentions => "/2/users/:id/mentions",
            Self::UsersLookup => "/2/users",
            Self::RecentSearch => "/2/tweets/search/recent",
            Self::FilterStream => "/2/tweets/search/stream",
            Self::SampleStream => "/2/tweets/sample/stream",
            Self::FilterStreamRules => "/2/tweets/search/stream/rules",
        }
    }

    /// Published quota
    pub fn quota(&self) -> Quota {
        match self {
            Self::UserFollowers | Self::UserFollowing => Quota::per_window(15),
            Self::UserTweets => Quota::per_window(1500),
            Self::UserMentions | Self::RecentSearch | Self::FilterStreamRules => {
                Quota::per_window(450)
            }
            Self::UsersLookup => Quota::per_window(300),
            Self::FilterStream | Self::SampleStream => Quota::per_window(50),
        }
    }

    /// Queue configuration paced by the published quota
    pub fn queue_config(&self) -> QueueConfig {
        self.quota().queue_config()
    }

    /// Whether responses carry continuation cursors
    pub fn is_paginated(&self) -> bool {
        matches!(
            self,
            Self::UserFollowers
                | Self::UserFollowing
                | Self::UserTweets
                | Self::UserMentions
                | Self::RecentSearch
        )
    }

    /// Whether the endpoint holds a connection open and streams frames
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::FilterStream | Self::SampleStream)
    }

    /// Number of `:id` placeholders in the path template
    pub fn id_count(&self) -> usize {
        self.template().matches(ID_PLACEHOLDER).count()
    }

    /// Fill the path template with `ids`, in order
    pub fn path(&self, ids: &[&str]) -> Result<String> {
        let expected = self.id_count();
        if ids.len() != expected {
            return Err(Error::invalid_value(
                "ids",
                format!(
                    "{} expects {} id(s), got {}",
                    self.name(),
                    expected,
                    ids.len()
                ),
            ));
        }

        let mut path = self.template().to_string();
        for id in ids {
            if id.is_empty() || id.contains('/') {
                return Err(Error::invalid_value("ids", format!("invalid id '{id}'")));
            }
            path = path.replacen(ID_PLACEHOLDER, id, 1);
        }
        Ok(path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| Error::invalid_value("endpoint", format!("unknown endpoint '{s}'")))
    }
}
