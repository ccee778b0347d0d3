use super::{highlight_path, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use pkgtar_core::{pack, PackRequest};
use tracing::debug;

pub fn run(request: PackRequest, json: bool) -> Result<u8, String> {
    debug!("archive request: {request:?}");
    let depfile_path = request.depfile.clone();
    let pb = if json {
        None
    } else {
        Some(spinner("archiving package..."))
    };

    let result = match pack(request) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "package archived");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "archive failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        let payload = serde_json::json!({
            "package": result.package_name,
            "archive": result.archive.archive,
            "bytes": result.archive.bytes,
            "entries": result.archive.entries,
            "manifest": result.manifest.render(),
            "depfile": depfile_path,
            "inputs": result.depfile.inputs(),
            "status": "archived"
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        let archive = result.archive.archive.to_string_lossy();
        match result.package_name.as_deref() {
            Some(name) => println!("archived '{name}' -> {}", highlight_path(&archive)),
            None => println!("archived {}", highlight_path(&archive)),
        }
        println!(
            "entries: {}, inputs: {}, bytes: {}",
            result.archive.entries.len(),
            result.depfile.inputs().len(),
            result.archive.bytes
        );
    }
    Ok(EXIT_SUCCESS)
}
