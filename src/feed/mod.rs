// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod channel;
mod render;

pub use channel::ChannelMetadata;
pub use render::{format_duration, format_pub_date, render, try_render};
