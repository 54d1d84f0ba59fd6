// SPDX-FileCopyrightText: 2026 Balbes Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Balbes tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without Telegram or a model API.
//!
//! # Components
//!
//! - [`MockProvider`] - scripted completions, errors and delays
//! - [`MockChannel`] - event injection and capture of texts, reactions and media
//! - [`MemoryStorage`] - in-memory chat history
//! - [`ManualClock`] - time that moves only when told to
//! - [`TestHarness`] - a full agent over a temp SQLite database

pub mod clock;
pub mod harness;
pub mod memory_storage;
pub mod mock_channel;
pub mod mock_gif;
pub mod mock_provider;

pub use clock::ManualClock;
pub use harness::{TEST_BOT, TEST_CHAT, TestHarness};
pub use memory_storage::MemoryStorage;
pub use mock_channel::{MockChannel, SentMedia, SentReaction, SentText};
pub use mock_gif::MockGifSource;
pub use mock_provider::{MOCK_AUDIO, MOCK_IMAGE, MockProvider, MockReply};
