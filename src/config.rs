// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `GITHUB_TOKEN` | Token for the GitHub contents API | Required |
//! | `GITHUB_REPO` | Repository holding the data (`owner/name`) | Required |
//! | `GITHUB_BRANCH` | Branch all reads and commits target | `main` |
//! | `GITHUB_API_URL` | API base URL (GitHub Enterprise) | `https://api.github.com` |
//! | `ENCRYPTION_ENABLED` | Encrypt file contents at rest | `true` |
//! | `GIT_CRYPT_KEY` | Base64 git-crypt key file | Required unless encryption is off |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the GitHub API token.
///
/// The token needs `contents: read/write` permission on the data repository;
/// it is sent as a Bearer credential on every request.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable name for the data repository, as `owner/name`.
pub const GITHUB_REPO_ENV: &str = "GITHUB_REPO";

/// Environment variable name for the branch all operations target.
pub const GITHUB_BRANCH_ENV: &str = "GITHUB_BRANCH";

/// Default branch when [`GITHUB_BRANCH_ENV`] is unset.
pub const DEFAULT_BRANCH: &str = "main";

/// Environment variable name for the API base URL.
///
/// Only needed for GitHub Enterprise installations; the public endpoint is
/// the default.
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";

/// Default API base URL when [`GITHUB_API_URL_ENV`] is unset.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable name toggling at-rest encryption.
///
/// Any of `false`, `0` or `no` (case-insensitive) disables encryption;
/// everything else, including unset, leaves it on.
pub const ENCRYPTION_ENABLED_ENV: &str = "ENCRYPTION_ENABLED";

/// Environment variable name for the base64-encoded git-crypt key file.
///
/// The decoded blob must be a version-2 git-crypt key file carrying the
/// AES-256 and HMAC keys. Required whenever encryption is enabled.
pub const CRYPT_KEY_ENV: &str = "GIT_CRYPT_KEY";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Default bind address when [`HOST_ENV`] is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Default bind port when [`PORT_ENV`] is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable name selecting the log format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
