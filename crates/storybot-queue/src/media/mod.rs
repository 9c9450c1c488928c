// SPDX-FileCopyrightText: 2026 Storybot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Story records, media downloads and album packing.

pub mod chunker;
pub mod downloader;
pub mod mapper;

pub use chunker::{DeclaredSize, chunk};
pub use downloader::{DownloadPolicy, download_all};
pub use mapper::{StoryRecord, map_stories};
