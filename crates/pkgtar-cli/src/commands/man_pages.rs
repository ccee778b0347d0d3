use super::EXIT_SUCCESS;
use clap::CommandFactory;
use std::path::Path;

pub fn run<C: CommandFactory>(dir: &Path) -> Result<u8, String> {
    let written = write_pages(&C::command(), dir)?;
    println!("{written} man page(s) written to {}", dir.display());
    Ok(EXIT_SUCCESS)
}

/// Render `<bin>.1` plus one `<bin>-<sub>.1` page per subcommand.
fn write_pages(cmd: &clap::Command, dir: &Path) -> Result<usize, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create dir: {e}"))?;
    let bin = cmd.get_name().to_owned();
    let mut pages = vec![(bin.clone(), cmd.clone())];
    for sub in cmd.get_subcommands() {
        let name = format!("{bin}-{}", sub.get_name());
        pages.push((name, sub.clone()));
    }

    for (name, page) in &pages {
        let mut buf = Vec::new();
        clap_mangen::Man::new(page.clone())
            .render(&mut buf)
            .map_err(|e| format!("man page render failed: {e}"))?;
        let path = dir.join(format!("{name}.1"));
        std::fs::write(&path, &buf)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }
    Ok(pages.len())
}
