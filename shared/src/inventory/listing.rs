use std::fmt::Write;

use log::warn;
use thiserror::Error;
use uuid::Uuid;

use crate::inventory::{AssetType, InventoryItem};

/// Unknown top-level tokens tolerated before a listing is abandoned
pub const MAX_UNKNOWN_TOKENS: usize = 25;

/// Errors that can occur while reading a legacy task inventory listing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    /// A block was opened but never closed
    #[error("Unterminated {keyword} block starting at line {line}")]
    Unterminated { keyword: &'static str, line: usize },

    /// A required id field held something other than a uuid
    #[error("Invalid uuid for {field} at line {line}")]
    InvalidUuid { field: &'static str, line: usize },

    /// Too many unknown top-level tokens
    #[error("Listing abandoned after {count} unknown tokens")]
    TooManyUnknownTokens { count: usize },
}

/// Parses the text listing delivered by the legacy transfer path. The
/// category entry is renamed "Contents" as the root of the listing.
pub fn parse_task_inventory(text: &str) -> Result<Vec<InventoryItem>, ListingError> {
    let mut items = Vec::new();
    let mut lines = text.lines().enumerate().peekable();
    let mut unknown = 0;

    while let Some((index, line)) = lines.next() {
        let keyword = line.split_whitespace().next().unwrap_or("");
        match keyword {
            "" => continue,
            "inv_object" => {
                let mut item = read_block(&mut lines, "inv_object", index + 1)?;
                item.asset_type = AssetType::Category;
                item.name = "Contents".to_string();
                items.push(item);
            }
            "inv_item" => items.push(read_block(&mut lines, "inv_item", index + 1)?),
            other => {
                unknown += 1;
                if unknown == 1 {
                    warn!("Unknown token '{}' in task inventory listing", other);
                }
                if unknown >= MAX_UNKNOWN_TOKENS {
                    return Err(ListingError::TooManyUnknownTokens { count: unknown });
                }
            }
        }
    }
    Ok(items)
}

fn read_block<'a, I>(
    lines: &mut std::iter::Peekable<I>,
    keyword: &'static str,
    start_line: usize,
) -> Result<InventoryItem, ListingError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut item = InventoryItem::category(Uuid::nil(), Uuid::nil(), "");
    item.asset_type = AssetType::Other(String::new());
    let mut depth = 0usize;
    let mut opened = false;

    for (index, line) in lines.by_ref() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed == "{" {
            depth += 1;
            opened = true;
            continue;
        }
        if trimmed == "}" {
            depth = depth.saturating_sub(1);
            if opened && depth == 0 {
                return Ok(item);
            }
            continue;
        }
        let (key, value) = match trimmed.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (trimmed, ""),
        };
        let uuid = |field: &'static str| {
            Uuid::parse_str(value).map_err(|_| ListingError::InvalidUuid {
                field,
                line: line_number,
            })
        };
        match key {
            "obj_id" => item.item_id = uuid("obj_id")?,
            "item_id" => item.item_id = uuid("item_id")?,
            "parent_id" => item.parent_id = uuid("parent_id")?,
            "asset_id" => item.asset_id = uuid("asset_id")?,
            "owner_id" => item.owner_id = uuid("owner_id")?,
            "owner_mask" => item.owner_mask = u32::from_str_radix(value, 16).unwrap_or(0),
            "flags" => item.flags = u32::from_str_radix(value, 16).unwrap_or(0),
            "type" => item.asset_type = AssetType::from_name(value),
            "name" => item.name = value.trim_end_matches('|').to_string(),
            "desc" => item.description = value.trim_end_matches('|').to_string(),
            "creation_date" => item.creation_date = value.parse().unwrap_or(0),
            _ => {}
        }
    }
    Err(ListingError::Unterminated {
        keyword,
        line: start_line,
    })
}

/// Writes items in the legacy listing layout read by `parse_task_inventory`.
pub fn write_task_inventory(items: &[InventoryItem]) -> String {
    let mut output = String::new();
    for item in items {
        if item.is_category() {
            let _ = write!(
                output,
                "\tinv_object\t0\n\t{{\n\t\tobj_id\t{}\n\t\tparent_id\t{}\n\t\ttype\tcategory\n\t\tname\t{}|\n\t}}\n",
                item.item_id, item.parent_id, item.name
            );
        } else {
            let _ = write!(
                output,
                "\tinv_item\t0\n\t{{\n\t\titem_id\t{}\n\t\tparent_id\t{}\n\tpermissions 0\n\t{{\n\t\towner_mask\t{:08x}\n\t\towner_id\t{}\n\t}}\n\t\tasset_id\t{}\n\t\ttype\t{}\n\t\tflags\t{:08x}\n\t\tname\t{}|\n\t\tdesc\t{}|\n\t\tcreation_date\t{}\n\t}}\n",
                item.item_id,
                item.parent_id,
                item.owner_mask,
                item.owner_id,
                item.asset_id,
                item.asset_type.name(),
                item.flags,
                item.name,
                item.description,
                item.creation_date
            );
        }
    }
    output
}
