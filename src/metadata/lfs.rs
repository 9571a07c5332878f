//! Parser for the pipe-delimited "LFS" screenshot description format.
//!
//! # Variants
//!
//! | variant | first tokens | application | field source |
//! |---------|--------------|-------------|--------------|
//! | LFS v1/v2 | `lfs\|<n>` | `lfs` | `key:value` tokens from index 2 |
//! | CVR | `lfs\|cvr\|<n>` | `cvr` | `key:value` tokens, CVR field rules |
//! | ScreenshotManager | `screenshotmanager\|<n>` | `screenshotmanager` | token 2 = author, token 3 = world |
//!
//! CVR exposes no stable user or world ids, so ids are left empty and the
//! raw id is folded into the display name as `"Name (id)"`.  LFS v1 stores
//! the world as a single bare name.
//!
//! # Fields
//! - `author:<id>,<name>`
//! - `world:<id>,<instanceId>,<name>` (v1: `world:<name>`)
//! - `pos:<x>,<y>,<z>`
//! - `rq:<quality>`
//! - `players:<id>,<x>,<y>,<z>,<name>;...`
//!
//! Unknown keys are ignored and a recognised key with an empty value is
//! skipped.  Missing tokens or fields are reported as
//! [`MetadataError::MalformedLfs`].

use super::{AuthorInfo, MetadataError, PlayerDetail, Position, ScreenshotMetadata, WorldInfo};

pub const APP_LFS: &str = "lfs";
pub const APP_CVR: &str = "cvr";
pub const APP_SCREENSHOT_MANAGER: &str = "screenshotmanager";

/// Which dialect a payload is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfsVariant {
    Lfs,
    Cvr,
    ScreenshotManager,
}

impl LfsVariant {
    pub fn detect(tokens: &[&str]) -> Self {
        match tokens {
            [APP_SCREENSHOT_MANAGER, ..] => LfsVariant::ScreenshotManager,
            [APP_LFS, APP_CVR, ..] => LfsVariant::Cvr,
            _ => LfsVariant::Lfs,
        }
    }
}

/// Parse an LFS description into a [`ScreenshotMetadata`].
pub fn parse(text: &str) -> Result<ScreenshotMetadata, MetadataError> {
    let mut tokens: Vec<&str> = text.split('|').collect();
    let variant = LfsVariant::detect(&tokens);
    if variant == LfsVariant::Cvr {
        tokens.remove(0);
    }

    let application = token(&tokens, 0, "application")?;
    let version_text = token(&tokens, 1, "version")?;
    let version = version_text
        .trim()
        .parse::<i32>()
        .map_err(|_| malformed(format!("version {version_text:?} is not an integer")))?;

    let mut meta = ScreenshotMetadata::new(application, version);
    match variant {
        LfsVariant::ScreenshotManager => parse_screenshot_manager(&tokens, &mut meta)?,
        LfsVariant::Lfs | LfsVariant::Cvr => {
            let rules = FieldRules { cvr: variant == LfsVariant::Cvr, version };
            for item in &tokens[2..] {
                parse_field(item, rules, &mut meta)?;
            }
        }
    }
    Ok(meta)
}

#[derive(Clone, Copy)]
struct FieldRules {
    cvr:     bool,
    version: i32,
}

fn parse_field(item: &str, rules: FieldRules, meta: &mut ScreenshotMetadata) -> Result<(), MetadataError> {
    let (key, value) = item
        .split_once(':')
        .ok_or_else(|| malformed(format!("field {item:?} has no key")))?;
    if value.is_empty() {
        return Ok(());
    }
    let parts: Vec<&str> = value.split(',').collect();

    match key {
        "author" => {
            let id = part(&parts, 0, key)?;
            let name = part(&parts, 1, key)?;
            meta.author = Some(if rules.cvr {
                AuthorInfo { id: String::new(), display_name: format!("{name} ({id})") }
            } else {
                AuthorInfo { id: id.to_owned(), display_name: name.to_owned() }
            });
        }
        "world" => {
            meta.world = Some(if rules.cvr {
                let id = part(&parts, 0, key)?;
                let name = part(&parts, 2, key)?;
                WorldInfo { id: String::new(), name: format!("{name} ({id})"), instance_id: String::new() }
            } else if rules.version == 1 {
                WorldInfo { id: String::new(), name: value.to_owned(), instance_id: String::new() }
            } else {
                WorldInfo {
                    id:          part(&parts, 0, key)?.to_owned(),
                    name:        part(&parts, 2, key)?.to_owned(),
                    instance_id: part(&parts, 1, key)?.to_owned(),
                }
            });
        }
        "pos" => {
            meta.position = Some(Position {
                x: part(&parts, 0, key)?.to_owned(),
                y: part(&parts, 1, key)?.to_owned(),
                z: part(&parts, 2, key)?.to_owned(),
            });
        }
        "rq" => meta.requested_quality = Some(value.to_owned()),
        "players" => {
            // A trailing ';' leaves an empty entry behind.
            for entry in value.split(';').filter(|e| !e.is_empty()) {
                meta.players.push(parse_player(entry, rules.cvr)?);
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_player(entry: &str, cvr: bool) -> Result<PlayerDetail, MetadataError> {
    let fields: Vec<&str> = entry.split(',').collect();
    let id = part(&fields, 0, "players")?;
    let name = part(&fields, 4, "players")?;
    Ok(PlayerDetail {
        id:           if cvr { String::new() } else { id.to_owned() },
        display_name: if cvr { format!("{name} ({id})") } else { name.to_owned() },
        x:            part(&fields, 1, "players")?.to_owned(),
        y:            part(&fields, 2, "players")?.to_owned(),
        z:            part(&fields, 3, "players")?.to_owned(),
    })
}

/// `screenshotmanager|<version>|author:<id>,<name>|<worldId>,<instanceId>,<worldName>`
fn parse_screenshot_manager(tokens: &[&str], meta: &mut ScreenshotMetadata) -> Result<(), MetadataError> {
    let author_token = token(tokens, 2, "author")?;
    let author: Vec<&str> = strip_key(author_token, "author").split(',').collect();
    meta.author = Some(AuthorInfo {
        id:           part(&author, 0, "author")?.to_owned(),
        display_name: part(&author, 1, "author")?.to_owned(),
    });

    let world_token = token(tokens, 3, "world")?;
    let world: Vec<&str> = strip_key(world_token, "world").split(',').collect();
    meta.world = Some(WorldInfo {
        id:          part(&world, 0, "world")?.to_owned(),
        instance_id: part(&world, 1, "world")?.to_owned(),
        name:        part(&world, 2, "world")?.to_owned(),
    });
    Ok(())
}

fn strip_key<'a>(token: &'a str, key: &str) -> &'a str {
    token
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(token)
}

fn token<'a>(tokens: &[&'a str], index: usize, what: &str) -> Result<&'a str, MetadataError> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| malformed(format!("missing {what} token at position {index}")))
}

fn part<'a>(parts: &[&'a str], index: usize, key: &str) -> Result<&'a str, MetadataError> {
    parts
        .get(index)
        .copied()
        .ok_or_else(|| malformed(format!("{key} field has no element {index}")))
}

fn malformed(reason: String) -> MetadataError {
    MetadataError::MalformedLfs(reason)
}
