// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod api;
mod media;
#[allow(clippy::module_inception)]
mod server;
mod state;

pub use server::make_app;
pub use state::{MediaDirs, ServerState};
