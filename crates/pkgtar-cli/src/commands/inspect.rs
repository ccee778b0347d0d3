use super::{highlight_path, json_pretty, EXIT_SUCCESS};
use pkgtar_store::list_archive;
use std::path::Path;

pub fn run(archive: &Path, json: bool) -> Result<u8, String> {
    let entries = list_archive(archive).map_err(|e| e.to_string())?;
    if json {
        let payload = serde_json::json!({
            "archive": archive,
            "entries": entries,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for entry in &entries {
            println!("{}", highlight_path(entry));
        }
    }
    Ok(EXIT_SUCCESS)
}
