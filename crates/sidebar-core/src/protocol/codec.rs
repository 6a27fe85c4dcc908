//! Version-aware codec for the scoreboard packets.
//!
//! Every encoded packet is a VarInt packet id followed by the body:
//! ```text
//! [packet_id:VarInt][body:N]
//! ```
//! Length framing and compression belong to the transport and are not part of
//! the output.
//!
//! The body layout depends on the [`Era`] of the target version:
//!
//! ```text
//! objective  Legacy: [name][mode:u8]([title:legacy≤32]["integer"])?
//!            Mid:    [name][mode:u8]([title:json][type:VarInt=0])?
//!            Modern: [name][mode:u8]([title:nbt][type:VarInt=0][has_fmt:bool][fmt]?)?
//! team       Legacy: [name][mode:u8]([display][prefix≤16][suffix≤16][flags:u8]
//!                    [nametag]([collision])?[color:i8])?([count:VarInt][entry]*)?
//!            Mid:    [name][mode:u8]([display:json][flags:u8][nametag][collision]
//!                    [color:VarInt][prefix:json][suffix:json])?([count][entry]*)?
//!            Modern: as Mid, with every text field as NBT
//! score      Legacy: [entry][action:u8][objective]([value:VarInt])?
//!            Mid:    [entry][action:VarInt][objective]([value:VarInt])?
//!            Modern: [entry][objective][value:VarInt][has_name:bool=false][has_fmt:bool][fmt]?
//! reset      Modern: [entry][has_objective:bool][objective]?
//! ```
//!
//! Before 1.20.3 there is no reset packet; [`ScoreboardPacket::ResetScore`] is
//! written as the score packet's remove action and decoded back to
//! `ResetScore`.

use thiserror::Error;
use tracing::trace;

use crate::protocol::packets::{
    DisplaySlot, NumberFormat, ObjectiveAction, ScoreboardPacket, TeamAction, LEGACY_AFFIX_CHARS,
    LEGACY_TITLE_CHARS, MAX_ENTRY_CHARS, MAX_IDENTIFIER_BYTES,
};
use crate::protocol::version::{Era, PacketIds, ProtocolVersion};
use crate::protocol::wire::{
    write_bool, write_json_component, write_nbt_component, write_string, write_var_int, WireReader,
};
use crate::text::{last_legacy_codes, text_component, WireText};

/// Errors that can occur during packet encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// A field violates a client limit; raised before any byte is produced.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The byte slice ended before the packet did.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The packet id is not one of the scoreboard packets for this version.
    #[error("unknown packet id: 0x{0:02X}")]
    UnknownPacketId(i32),

    /// The version predates every entry in the packet-id table.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(ProtocolVersion),

    /// The body could not be parsed (unknown mode, bad UTF-8, bad NBT, ...).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// ── Constants ─────────────────────────────────────────────────────────────────

const RENDER_TYPE_INTEGER: &str = "integer";
const NAMETAG_ALWAYS: &str = "always";
const COLLISION_ALWAYS: &str = "always";
/// Legacy colour byte meaning "no colour".
const LEGACY_COLOR_NONE: i8 = -1;
/// Mid/modern colour VarInt for `reset`.
const COLOR_RESET: i32 = 21;

const SCORE_ACTION_SET: i32 = 0;
const SCORE_ACTION_REMOVE: i32 = 1;

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `packet` for a client speaking `version`.
///
/// # Errors
///
/// Returns [`ProtocolError::Validation`] for an empty or oversized identifier,
/// [`ProtocolError::UnsupportedVersion`] for versions older than 1.8.
///
/// # Examples
///
/// ```rust
/// use sidebar_core::protocol::{decode_packet, encode_packet, DisplaySlot, ProtocolVersion};
/// use sidebar_core::protocol::packets::ScoreboardPacket;
///
/// let packet = ScoreboardPacket::DisplayObjective {
///     slot: DisplaySlot::Sidebar,
///     name: "sb-1a2b3c".to_string(),
/// };
/// let bytes = encode_packet(&packet, ProtocolVersion::MINECRAFT_1_8).unwrap();
/// let (decoded, consumed) = decode_packet(&bytes, ProtocolVersion::MINECRAFT_1_8).unwrap();
/// assert_eq!(decoded, packet);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_packet(
    packet: &ScoreboardPacket,
    version: ProtocolVersion,
) -> Result<Vec<u8>, ProtocolError> {
    let ids = version
        .packet_ids()
        .ok_or(ProtocolError::UnsupportedVersion(version))?;
    validate(packet, version)?;

    let mut buf = Vec::with_capacity(64);
    write_var_int(&mut buf, packet_id(packet, &ids, version));

    match packet {
        ScoreboardPacket::Objective { name, action } => {
            encode_objective(&mut buf, name, action, version)?
        }
        ScoreboardPacket::DisplayObjective { slot, name } => {
            encode_display(&mut buf, *slot, name, version)?
        }
        ScoreboardPacket::Team { name, action } => encode_team(&mut buf, name, action, version)?,
        ScoreboardPacket::SetScore {
            entry,
            objective,
            value,
            number_format,
        } => encode_set_score(&mut buf, entry, objective, *value, number_format.as_ref(), version)?,
        ScoreboardPacket::ResetScore { entry, objective } => {
            encode_reset_score(&mut buf, entry, objective, version)?
        }
    }
    trace!(kind = packet.kind(), version = version.0, len = buf.len(), "encoded packet");
    Ok(buf)
}

/// Decodes one packet from the beginning of `bytes`, as written for
/// `version`.
///
/// Returns the packet and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are truncated or malformed.
pub fn decode_packet(
    bytes: &[u8],
    version: ProtocolVersion,
) -> Result<(ScoreboardPacket, usize), ProtocolError> {
    let ids = version
        .packet_ids()
        .ok_or(ProtocolError::UnsupportedVersion(version))?;
    let mut r = WireReader::new(bytes);
    let id = r.read_var_int()?;

    let packet = if id == ids.update_objectives {
        decode_objective(&mut r, version)?
    } else if id == ids.display_objective {
        decode_display(&mut r, version)?
    } else if id == ids.update_teams {
        decode_team(&mut r, version)?
    } else if id == ids.update_score {
        decode_score(&mut r, version)?
    } else if Some(id) == ids.reset_score {
        decode_reset_score(&mut r)?
    } else {
        return Err(ProtocolError::UnknownPacketId(id));
    };
    Ok((packet, r.position()))
}

/// Truncates a legacy objective title to what pre-1.13 clients accept.
pub fn truncate_legacy_title(title: &str) -> String {
    title.chars().take(LEGACY_TITLE_CHARS).collect()
}

/// Splits a legacy line into a team prefix and suffix of at most 16
/// characters each, carrying active colour codes over into the suffix and
/// never cutting a `§` code in half.
pub fn split_legacy_text(text: &str) -> (String, String) {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= LEGACY_AFFIX_CHARS {
        return (text.to_string(), String::new());
    }

    let mut cut = LEGACY_AFFIX_CHARS;
    if chars[cut - 1] == '§' {
        cut -= 1;
    }
    let prefix: String = chars[..cut].iter().collect();
    let rest: String = chars[cut..].iter().collect();

    let mut suffix: Vec<char> = last_legacy_codes(&prefix).chars().chain(rest.chars()).collect();
    suffix.truncate(LEGACY_AFFIX_CHARS);
    if suffix.last() == Some(&'§') {
        suffix.pop();
    }
    (prefix, suffix.into_iter().collect())
}

// ── Validation ────────────────────────────────────────────────────────────────

fn validate(packet: &ScoreboardPacket, version: ProtocolVersion) -> Result<(), ProtocolError> {
    match packet {
        ScoreboardPacket::Objective { name, .. } | ScoreboardPacket::DisplayObjective { name, .. } => {
            validate_identifier("objective", name)
        }
        ScoreboardPacket::Team { name, action } => {
            if name.is_empty() {
                return Err(ProtocolError::Validation("team name is empty".to_string()));
            }
            if version.era() == Era::Legacy && name.len() > MAX_IDENTIFIER_BYTES {
                return Err(ProtocolError::Validation(format!(
                    "team name {name:?} is {} bytes, legacy clients accept {MAX_IDENTIFIER_BYTES}",
                    name.len()
                )));
            }
            if let TeamAction::Create { entries, .. } = action {
                for entry in entries {
                    validate_entry(entry)?;
                }
            }
            Ok(())
        }
        ScoreboardPacket::SetScore {
            entry, objective, ..
        }
        | ScoreboardPacket::ResetScore { entry, objective } => {
            validate_entry(entry)?;
            validate_identifier("objective", objective)
        }
    }
}

fn validate_identifier(kind: &str, name: &str) -> Result<(), ProtocolError> {
    if name.is_empty() {
        return Err(ProtocolError::Validation(format!("{kind} name is empty")));
    }
    if name.len() > MAX_IDENTIFIER_BYTES {
        return Err(ProtocolError::Validation(format!(
            "{kind} name {name:?} is {} bytes, limit is {MAX_IDENTIFIER_BYTES}",
            name.len()
        )));
    }
    Ok(())
}

fn validate_entry(entry: &str) -> Result<(), ProtocolError> {
    let chars = entry.chars().count();
    if entry.is_empty() || chars > MAX_ENTRY_CHARS {
        return Err(ProtocolError::Validation(format!(
            "score entry {entry:?} must be 1..={MAX_ENTRY_CHARS} characters"
        )));
    }
    Ok(())
}

fn packet_id(packet: &ScoreboardPacket, ids: &PacketIds, version: ProtocolVersion) -> i32 {
    match packet {
        ScoreboardPacket::Objective { .. } => ids.update_objectives,
        ScoreboardPacket::DisplayObjective { .. } => ids.display_objective,
        ScoreboardPacket::Team { .. } => ids.update_teams,
        ScoreboardPacket::SetScore { .. } => ids.update_score,
        ScoreboardPacket::ResetScore { .. } => match (version.era(), ids.reset_score) {
            (Era::Modern, Some(id)) => id,
            _ => ids.update_score,
        },
    }
}

// ── Encoders ──────────────────────────────────────────────────────────────────

fn encode_objective(
    buf: &mut Vec<u8>,
    name: &str,
    action: &ObjectiveAction,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    write_string(buf, name)?;
    buf.push(action.mode());

    let (title, number_format) = match action {
        ObjectiveAction::Create {
            title,
            number_format,
        }
        | ObjectiveAction::Update {
            title,
            number_format,
        } => (title, number_format.as_ref()),
        ObjectiveAction::Remove => return Ok(()),
    };

    match version.era() {
        Era::Legacy => {
            write_string(buf, &truncate_legacy_title(&title.legacy))?;
            write_string(buf, RENDER_TYPE_INTEGER)?;
        }
        Era::Mid => {
            write_json_component(buf, &title.json)?;
            write_var_int(buf, 0);
        }
        Era::Modern => {
            write_nbt_component(buf, &title.json)?;
            write_var_int(buf, 0);
            encode_optional_number_format(buf, number_format)?;
        }
    }
    Ok(())
}

fn encode_display(
    buf: &mut Vec<u8>,
    slot: DisplaySlot,
    name: &str,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    // 1.20.2 widened the slot to a VarInt.
    if version >= ProtocolVersion::MINECRAFT_1_20_2 {
        write_var_int(buf, slot as i32);
    } else {
        buf.push(slot as u8);
    }
    write_string(buf, name)
}

fn encode_team(
    buf: &mut Vec<u8>,
    name: &str,
    action: &TeamAction,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    write_string(buf, name)?;
    buf.push(action.mode());

    let text = match action {
        TeamAction::Create { text, .. } | TeamAction::Update { text } => text,
        TeamAction::Remove => return Ok(()),
    };

    match version.era() {
        Era::Legacy => {
            let (prefix, suffix) = split_legacy_text(&text.legacy);
            write_string(buf, name)?;
            write_string(buf, &prefix)?;
            write_string(buf, &suffix)?;
            buf.push(0x00);
            write_string(buf, NAMETAG_ALWAYS)?;
            if version.has_collision_rule() {
                write_string(buf, COLLISION_ALWAYS)?;
            }
            buf.push(LEGACY_COLOR_NONE as u8);
        }
        Era::Mid | Era::Modern => {
            let modern = version.era() == Era::Modern;
            let write_text = |buf: &mut Vec<u8>, json: &str| -> Result<(), ProtocolError> {
                if modern {
                    write_nbt_component(buf, json)
                } else {
                    write_json_component(buf, json)
                }
            };
            write_text(buf, &text_component(name))?;
            buf.push(0x00);
            write_string(buf, NAMETAG_ALWAYS)?;
            write_string(buf, COLLISION_ALWAYS)?;
            write_var_int(buf, COLOR_RESET);
            write_text(buf, &text.json)?;
            write_text(buf, &WireText::empty().json)?;
        }
    }

    if let TeamAction::Create { entries, .. } = action {
        write_var_int(buf, entries.len() as i32);
        for entry in entries {
            write_string(buf, entry)?;
        }
    }
    Ok(())
}

fn encode_set_score(
    buf: &mut Vec<u8>,
    entry: &str,
    objective: &str,
    value: i32,
    number_format: Option<&NumberFormat>,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    write_string(buf, entry)?;
    match version.era() {
        Era::Legacy | Era::Mid => {
            write_score_action(buf, SCORE_ACTION_SET, version);
            write_string(buf, objective)?;
            write_var_int(buf, value);
        }
        Era::Modern => {
            write_string(buf, objective)?;
            write_var_int(buf, value);
            write_bool(buf, false);
            encode_optional_number_format(buf, number_format)?;
        }
    }
    Ok(())
}

fn encode_reset_score(
    buf: &mut Vec<u8>,
    entry: &str,
    objective: &str,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    write_string(buf, entry)?;
    match version.era() {
        Era::Legacy | Era::Mid => {
            write_score_action(buf, SCORE_ACTION_REMOVE, version);
            write_string(buf, objective)?;
        }
        Era::Modern => {
            write_bool(buf, true);
            write_string(buf, objective)?;
        }
    }
    Ok(())
}

fn write_score_action(buf: &mut Vec<u8>, action: i32, version: ProtocolVersion) {
    if version.era() == Era::Legacy {
        buf.push(action as u8);
    } else {
        write_var_int(buf, action);
    }
}

fn encode_optional_number_format(
    buf: &mut Vec<u8>,
    format: Option<&NumberFormat>,
) -> Result<(), ProtocolError> {
    let Some(format) = format else {
        write_bool(buf, false);
        return Ok(());
    };
    write_bool(buf, true);
    write_var_int(buf, format.tag());
    match format {
        NumberFormat::Blank => Ok(()),
        NumberFormat::Styled(style) => write_nbt_component(buf, style),
        NumberFormat::Fixed(component) => write_nbt_component(buf, component),
    }
}

// ── Decoders ──────────────────────────────────────────────────────────────────

fn decode_objective(
    r: &mut WireReader<'_>,
    version: ProtocolVersion,
) -> Result<ScoreboardPacket, ProtocolError> {
    let name = r.read_string()?;
    let mode = r.read_u8()?;
    if mode == 1 {
        return Ok(ScoreboardPacket::Objective {
            name,
            action: ObjectiveAction::Remove,
        });
    }
    if mode != 0 && mode != 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "unknown objective mode {mode}"
        )));
    }

    let (title, number_format) = match version.era() {
        Era::Legacy => {
            let title = WireText::from_legacy(r.read_string()?);
            let render_type = r.read_string()?;
            if render_type != RENDER_TYPE_INTEGER && render_type != "hearts" {
                return Err(ProtocolError::MalformedPayload(format!(
                    "unknown render type {render_type:?}"
                )));
            }
            (title, None)
        }
        Era::Mid => {
            let title = WireText::from_json(r.read_string()?);
            r.read_var_int()?;
            (title, None)
        }
        Era::Modern => {
            let title = WireText::from_json(r.read_nbt_component()?);
            r.read_var_int()?;
            (title, decode_optional_number_format(r)?)
        }
    };

    let action = if mode == 0 {
        ObjectiveAction::Create {
            title,
            number_format,
        }
    } else {
        ObjectiveAction::Update {
            title,
            number_format,
        }
    };
    Ok(ScoreboardPacket::Objective { name, action })
}

fn decode_display(
    r: &mut WireReader<'_>,
    version: ProtocolVersion,
) -> Result<ScoreboardPacket, ProtocolError> {
    let raw = if version >= ProtocolVersion::MINECRAFT_1_20_2 {
        r.read_var_int()?
    } else {
        i32::from(r.read_u8()?)
    };
    let slot = DisplaySlot::try_from(raw)
        .map_err(|_| ProtocolError::MalformedPayload(format!("unknown display slot {raw}")))?;
    let name = r.read_string()?;
    Ok(ScoreboardPacket::DisplayObjective { slot, name })
}

fn decode_team(
    r: &mut WireReader<'_>,
    version: ProtocolVersion,
) -> Result<ScoreboardPacket, ProtocolError> {
    let name = r.read_string()?;
    let mode = r.read_u8()?;
    match mode {
        1 => {
            return Ok(ScoreboardPacket::Team {
                name,
                action: TeamAction::Remove,
            })
        }
        0 | 2 => {}
        other => {
            return Err(ProtocolError::MalformedPayload(format!(
                "unsupported team mode {other}"
            )))
        }
    }

    let text = match version.era() {
        Era::Legacy => {
            let _display = r.read_string()?;
            let prefix = r.read_string()?;
            let suffix = r.read_string()?;
            let _flags = r.read_u8()?;
            let _nametag = r.read_string()?;
            if version.has_collision_rule() {
                let _collision = r.read_string()?;
            }
            let _color = r.read_i8()?;
            WireText::from_legacy(format!("{prefix}{}", strip_carried_codes(&prefix, &suffix)))
        }
        era => {
            let read_text = |r: &mut WireReader<'_>| -> Result<String, ProtocolError> {
                if era == Era::Modern {
                    r.read_nbt_component()
                } else {
                    r.read_string()
                }
            };
            let _display = read_text(r)?;
            let _flags = r.read_u8()?;
            let _nametag = r.read_string()?;
            let _collision = r.read_string()?;
            let _color = r.read_var_int()?;
            let prefix = read_text(r)?;
            let _suffix = read_text(r)?;
            WireText::from_json(prefix)
        }
    };

    let action = if mode == 0 {
        let count = r.read_var_int()?;
        let count = usize::try_from(count).map_err(|_| {
            ProtocolError::MalformedPayload(format!("negative entry count {count}"))
        })?;
        let mut entries = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            entries.push(r.read_string()?);
        }
        TeamAction::Create { text, entries }
    } else {
        TeamAction::Update { text }
    };
    Ok(ScoreboardPacket::Team { name, action })
}

/// Removes the colour codes [`split_legacy_text`] copied into the suffix.
fn strip_carried_codes<'a>(prefix: &str, suffix: &'a str) -> &'a str {
    let carried = last_legacy_codes(prefix);
    suffix.strip_prefix(carried.as_str()).unwrap_or(suffix)
}

fn decode_score(
    r: &mut WireReader<'_>,
    version: ProtocolVersion,
) -> Result<ScoreboardPacket, ProtocolError> {
    let entry = r.read_string()?;
    if version.era() == Era::Modern {
        let objective = r.read_string()?;
        let value = r.read_var_int()?;
        if r.read_bool()? {
            let _display_name = r.read_nbt_component()?;
        }
        let number_format = decode_optional_number_format(r)?;
        return Ok(ScoreboardPacket::SetScore {
            entry,
            objective,
            value,
            number_format,
        });
    }

    let action = if version.era() == Era::Legacy {
        i32::from(r.read_u8()?)
    } else {
        r.read_var_int()?
    };
    let objective = r.read_string()?;
    match action {
        SCORE_ACTION_SET => Ok(ScoreboardPacket::SetScore {
            entry,
            objective,
            value: r.read_var_int()?,
            number_format: None,
        }),
        SCORE_ACTION_REMOVE => Ok(ScoreboardPacket::ResetScore { entry, objective }),
        other => Err(ProtocolError::MalformedPayload(format!(
            "unknown score action {other}"
        ))),
    }
}

fn decode_reset_score(r: &mut WireReader<'_>) -> Result<ScoreboardPacket, ProtocolError> {
    let entry = r.read_string()?;
    let objective = if r.read_bool()? {
        r.read_string()?
    } else {
        String::new()
    };
    Ok(ScoreboardPacket::ResetScore { entry, objective })
}

fn decode_optional_number_format(
    r: &mut WireReader<'_>,
) -> Result<Option<NumberFormat>, ProtocolError> {
    if !r.read_bool()? {
        return Ok(None);
    }
    let format = match r.read_var_int()? {
        0 => NumberFormat::Blank,
        1 => NumberFormat::Styled(r.read_nbt_component()?),
        2 => NumberFormat::Fixed(r.read_nbt_component()?),
        other => {
            return Err(ProtocolError::MalformedPayload(format!(
                "unknown number format {other}"
            )))
        }
    };
    Ok(Some(format))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
