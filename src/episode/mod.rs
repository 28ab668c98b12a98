// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod artwork;
mod filename;
mod model;

pub use artwork::fetch_artwork;
pub use filename::{
    is_audio_extension, is_image_extension, is_plain_filename, sanitize_title, unique_stem,
    upload_extension,
};
pub use model::Episode;
