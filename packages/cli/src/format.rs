//! Human-readable rendering of wire items.

use std::io::{self, Write};

use treefs_http::{FileType, WireItem};
use treefs_store::Permission;

/// `ls -l` style mode string for a wire item.
pub fn mode_string(item: &WireItem) -> String {
    let type_char = match item.file_type {
        Some(FileType::Dir) => 'd',
        Some(FileType::File) => '-',
        None => '?',
    };
    Permission::from_mode(item.permission).render(type_char)
}

fn type_name(item: &WireItem) -> &'static str {
    item.file_type.map(|t| t.as_str()).unwrap_or("other")
}

/// Print a summary of `item`, then its children or its content.
pub fn print_item(out: &mut impl Write, item: &WireItem) -> io::Result<()> {
    writeln!(out, "name: {}", item.name)?;
    writeln!(out, "permission: {}", mode_string(item))?;
    writeln!(out, "owner: {}", item.owner)?;
    writeln!(out, "type: {}", type_name(item))?;
    writeln!(out, "size (in bytes): {}", item.size)?;

    match item.file_type {
        Some(FileType::Dir) => {
            let children = item.children.as_deref().unwrap_or_default();
            if !children.is_empty() {
                writeln!(out)?;
                for child in children {
                    writeln!(
                        out,
                        "{}  {:<15} {:<10} {:>5}   {}",
                        mode_string(child),
                        child.owner,
                        child.size,
                        type_name(child),
                        child.name
                    )?;
                }
            }
        }
        Some(FileType::File) => {
            if let Some(data) = item.data.as_deref().filter(|d| !d.is_empty()) {
                writeln!(out)?;
                writeln!(out, "{}", data)?;
            }
        }
        None => {}
    }
    Ok(())
}
