// gcsr converts binary edge lists into compressed sparse row graphs
// Copyright (C) 2022 Jacob Konrad
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{error::Result, Error};

/// Regular files directly inside `dir` whose extension is `extension`,
/// sorted by path.
///
/// `extension` may be given with or without the leading dot.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>>
{
    let dir = dir.as_ref();
    let extension = extension.trim_start_matches('.');

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(Error::io(dir))? {
        let entry = entry.map_err(Error::io(dir))?;
        let path = entry.path();
        let is_file = entry.file_type().map_err(Error::io(&path))?.is_file();
        if is_file && path.extension().map_or(false, |ext| ext == extension) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
