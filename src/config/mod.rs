// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service configuration: schema types and loading from TOML + environment.

mod load;
mod schema;

pub use load::{CONFIG_PATH_ENV, default_config_path, expand_path, resolve_config_path};
pub use schema::*;
