// SPDX-License-Identifier: GPL-3.0-only

//! Inventory parser for LVM reports
//!
//! `lvs`, `vgs` and `pvs` are asked for a fixed column list rendered with
//! `--nameprefixes` and a custom separator, so one report line looks like:
//!
//! ```text
//! LVM2_LV_NAME='data'<:SEP:>LVM2_LV_SIZE='1073741824'<:SEP:>...
//! ```
//!
//! This layout is the wire format of the tools. The column lists and
//! report flags below must stay in lockstep with the parsing code.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use lvmd_types::{LogicalVolume, PhysicalVolume, VolumeGroup};

use crate::error::{LvmError, Result};

/// Separator passed as `--separator` to the report tools
pub const FIELD_SEPARATOR: &str = "<:SEP:>";

/// Prefix LVM puts in front of every field name with `--nameprefixes`
pub const FIELD_PREFIX: &str = "LVM2_";

/// Flags shared by every report invocation, before `-o`
const REPORT_FLAGS: [&str; 4] = ["--units=b", "--separator=<:SEP:>", "--nosuffix", "--noheadings"];

/// Kind of record a report line describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    LogicalVolume,
    VolumeGroup,
    PhysicalVolume,
}

impl RecordKind {
    /// Report tool producing this kind of record
    pub fn tool(self) -> &'static str {
        match self {
            RecordKind::LogicalVolume => "lvs",
            RecordKind::VolumeGroup => "vgs",
            RecordKind::PhysicalVolume => "pvs",
        }
    }
}

/// A parsed report line of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    LogicalVolume(LogicalVolume),
    VolumeGroup(VolumeGroup),
    PhysicalVolume(PhysicalVolume),
}

/// A record type that can be read from one report line
pub trait InventoryRecord: Sized {
    const KIND: RecordKind;

    /// Report columns requested with `-o`, in order
    const COLUMNS: &'static [&'static str];

    fn from_fields(fields: &Fields<'_>) -> Result<Self>;
}

/// Arguments for a report invocation of `T`'s tool, without any selector
pub fn report_args<T: InventoryRecord>() -> Vec<String> {
    let mut args: Vec<String> = REPORT_FLAGS.iter().map(|flag| flag.to_string()).collect();
    args.push("-o".to_string());
    args.push(T::COLUMNS.join(","));
    args.push("--nameprefixes".to_string());
    args.push("-a".to_string());
    args
}

/// Field values of one report line, keyed by upper-case column name
pub struct Fields<'a> {
    line: &'a str,
    values: HashMap<String, &'a str>,
}

impl<'a> Fields<'a> {
    fn split(line: &'a str, expected: usize) -> Result<Self> {
        if line.is_empty() {
            return Err(malformed("empty line", line));
        }

        let parts: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if parts.len() != expected {
            return Err(malformed(
                format!("expected {expected} fields, found {}", parts.len()),
                line,
            ));
        }

        let mut values = HashMap::with_capacity(parts.len());
        for part in parts {
            let part = part.trim();
            let Some(named) = part.strip_prefix(FIELD_PREFIX) else {
                return Err(malformed(format!("field without {FIELD_PREFIX} prefix"), line));
            };
            let Some((key, value)) = named.split_once('=') else {
                return Err(malformed(format!("field {named:?} has no value"), line));
            };
            values.insert(key.to_string(), unquote(value));
        }

        Ok(Self { line, values })
    }

    fn get_any(&self, keys: &[&str]) -> Result<&'a str> {
        keys.iter()
            .find_map(|key| self.values.get(*key).copied())
            .ok_or_else(|| malformed(format!("missing field {}", keys[0]), self.line))
    }

    /// Bare string value of a column
    pub fn text(&self, column: &str) -> Result<String> {
        Ok(self.get_any(&[column])?.to_string())
    }

    /// Required numeric value
    pub fn number<N: FromStr>(&self, column: &str) -> Result<N> {
        let value = self.get_any(&[column])?;
        value
            .parse()
            .map_err(|_| malformed(format!("{column} is not a number: {value:?}"), self.line))
    }

    /// Numeric value that may be reported empty (or `-1`) when unavailable
    pub fn optional_number<N: FromStr>(&self, columns: &[&str]) -> Result<Option<N>> {
        let value = self.get_any(columns)?;
        if value.is_empty() || value == "-1" {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|_| malformed(format!("{} is not a number: {value:?}", columns[0]), self.line))
    }

    /// Comma-separated tag list
    pub fn tags(&self, column: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .get_any(&[column])?
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect())
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn malformed(reason: impl Into<String>, line: &str) -> LvmError {
    LvmError::MalformedRecord {
        reason: reason.into(),
        line: line.to_string(),
    }
}

impl InventoryRecord for LogicalVolume {
    const KIND: RecordKind = RecordKind::LogicalVolume;
    const COLUMNS: &'static [&'static str] = &[
        "lv_name",
        "lv_size",
        "lv_uuid",
        "lv_attr",
        "copy_percent",
        "lv_kernel_major",
        "lv_kernel_minor",
        "lv_tags",
    ];

    fn from_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(LogicalVolume {
            name: fields.text("LV_NAME")?,
            size: fields.number("LV_SIZE")?,
            uuid: fields.text("LV_UUID")?,
            attr: fields.text("LV_ATTR")?,
            // Newer LVM releases report copy_percent under its sync_percent alias
            copy_percent: fields.optional_number(&["COPY_PERCENT", "SYNC_PERCENT"])?,
            kernel_major: fields.optional_number(&["LV_KERNEL_MAJOR"])?,
            kernel_minor: fields.optional_number(&["LV_KERNEL_MINOR"])?,
            tags: fields.tags("LV_TAGS")?,
        })
    }
}

impl InventoryRecord for VolumeGroup {
    const KIND: RecordKind = RecordKind::VolumeGroup;
    const COLUMNS: &'static [&'static str] = &["vg_name", "vg_size", "vg_free", "vg_uuid", "vg_tags"];

    fn from_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(VolumeGroup {
            name: fields.text("VG_NAME")?,
            size: fields.number("VG_SIZE")?,
            free: fields.number("VG_FREE")?,
            uuid: fields.text("VG_UUID")?,
            tags: fields.tags("VG_TAGS")?,
        })
    }
}

impl InventoryRecord for PhysicalVolume {
    const KIND: RecordKind = RecordKind::PhysicalVolume;
    const COLUMNS: &'static [&'static str] =
        &["pv_name", "pv_size", "pv_used", "pv_free", "pv_fmt", "pv_uuid"];

    fn from_fields(fields: &Fields<'_>) -> Result<Self> {
        Ok(PhysicalVolume {
            name: fields.text("PV_NAME")?,
            size: fields.number("PV_SIZE")?,
            used: fields.number("PV_USED")?,
            free: fields.number("PV_FREE")?,
            format: fields.text("PV_FMT")?,
            uuid: fields.text("PV_UUID")?,
        })
    }
}

/// Parse one report line as a `T`
pub fn parse_record<T: InventoryRecord>(line: &str) -> Result<T> {
    let fields = Fields::split(line.trim(), T::COLUMNS.len())?;
    T::from_fields(&fields)
}

/// Parse one report line of the given kind
pub fn parse_line(kind: RecordKind, line: &str) -> Result<Record> {
    Ok(match kind {
        RecordKind::LogicalVolume => Record::LogicalVolume(parse_record(line)?),
        RecordKind::VolumeGroup => Record::VolumeGroup(parse_record(line)?),
        RecordKind::PhysicalVolume => Record::PhysicalVolume(parse_record(line)?),
    })
}

/// Parse a full report. One bad line fails the whole listing.
pub fn parse_listing<T: InventoryRecord>(output: &str) -> Result<Vec<T>> {
    let output = output.trim();
    if output.is_empty() {
        return Ok(Vec::new());
    }

    output.lines().map(|line| parse_record(line.trim())).collect()
}

/// Second `#`-separated field of a plain (non-prefixed) report line
pub fn second_field(program: &str, output: &str) -> Result<String> {
    let line = output.trim().lines().next().unwrap_or_default();
    line.split('#')
        .nth(1)
        .map(|field| field.trim().to_string())
        .ok_or_else(|| LvmError::UnexpectedOutputShape {
            program: program.to_string(),
            output: output.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lv_line(name: &str, size: &str, tags: &str) -> String {
        [
            format!("LVM2_LV_NAME='{name}'"),
            format!("LVM2_LV_SIZE='{size}'"),
            "LVM2_LV_UUID='abc-123'".to_string(),
            "LVM2_LV_ATTR='-wi-a-----'".to_string(),
            "LVM2_COPY_PERCENT=''".to_string(),
            "LVM2_LV_KERNEL_MAJOR='253'".to_string(),
            "LVM2_LV_KERNEL_MINOR='4'".to_string(),
            format!("LVM2_LV_TAGS='{tags}'"),
        ]
        .join(FIELD_SEPARATOR)
    }

    #[test]
    fn parses_logical_volume_line() {
        let lv: LogicalVolume = parse_record(&lv_line("data", "1073741824", "a,b")).unwrap();

        assert_eq!(lv.name, "data");
        assert_eq!(lv.size, 1_073_741_824);
        assert_eq!(lv.uuid, "abc-123");
        assert_eq!(lv.copy_percent, None);
        assert_eq!(lv.device_number(), Some((253, 4)));
        assert_eq!(
            lv.tags,
            ["b", "a"]
                .iter()
                .map(|tag| tag.to_string())
                .collect::<BTreeSet<String>>()
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let line = lv_line("data", "1073741824", "a,b");
        let first = parse_line(RecordKind::LogicalVolume, &line).unwrap();
        let second = parse_line(RecordKind::LogicalVolume, &line).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn inactive_volume_has_no_device_numbers() {
        let line = lv_line("data", "0", "")
            .replace("LVM2_LV_KERNEL_MAJOR='253'", "LVM2_LV_KERNEL_MAJOR='-1'")
            .replace("LVM2_LV_KERNEL_MINOR='4'", "LVM2_LV_KERNEL_MINOR=''");
        let lv: LogicalVolume = parse_record(&line).unwrap();

        assert_eq!(lv.size, 0);
        assert_eq!(lv.kernel_major, None);
        assert_eq!(lv.kernel_minor, None);
        assert!(lv.tags.is_empty());
    }

    #[test]
    fn reads_sync_percent_alias() {
        let line = lv_line("mirror", "4096", "").replace(
            "LVM2_COPY_PERCENT=''",
            "LVM2_SYNC_PERCENT='37.50'",
        );
        let lv: LogicalVolume = parse_record(&line).unwrap();
        assert_eq!(lv.copy_percent, Some(37.5));
    }

    #[test]
    fn rejects_wrong_field_count() {
        let line = lv_line("data", "1", "").replace("<:SEP:>LVM2_LV_TAGS=''", "");
        let error = parse_record::<LogicalVolume>(&line).unwrap_err();
        assert!(matches!(error, LvmError::MalformedRecord { .. }));
    }

    #[test]
    fn rejects_non_numeric_size() {
        let error = parse_record::<LogicalVolume>(&lv_line("data", "1.00g", "")).unwrap_err();
        assert!(error.to_string().contains("LV_SIZE is not a number"));
    }

    #[test]
    fn rejects_unprefixed_fields() {
        let line = lv_line("data", "1", "").replace("LVM2_LV_NAME", "LV_NAME");
        assert!(parse_record::<LogicalVolume>(&line).is_err());

        let tabbed = "vg0\t100\t25\tuuid\t";
        assert!(parse_record::<VolumeGroup>(tabbed).is_err());
    }

    #[test]
    fn parses_volume_group_and_physical_volume() {
        let vg: VolumeGroup = parse_record(
            "  LVM2_VG_NAME='vg0'<:SEP:>LVM2_VG_SIZE='214744170496'<:SEP:>LVM2_VG_FREE='0'<:SEP:>LVM2_VG_UUID='Xy-1'<:SEP:>LVM2_VG_TAGS='protected'",
        )
        .unwrap();
        assert_eq!(vg.name, "vg0");
        assert_eq!(vg.free, 0);
        assert!(vg.tags.contains("protected"));

        let pv: PhysicalVolume = parse_record(
            "LVM2_PV_NAME='/dev/sdb'<:SEP:>LVM2_PV_SIZE='1000'<:SEP:>LVM2_PV_USED='400'<:SEP:>LVM2_PV_FREE='600'<:SEP:>LVM2_PV_FMT='lvm2'<:SEP:>LVM2_PV_UUID='pv-1'",
        )
        .unwrap();
        assert_eq!(pv.name, "/dev/sdb");
        assert_eq!(pv.used + pv.free, pv.size);
        assert_eq!(pv.format, "lvm2");
    }

    #[test]
    fn listing_is_all_or_nothing() {
        let good = lv_line("one", "1", "");
        let output = format!("  {good}\n  {}\n", lv_line("two", "2", "x"));
        let lvs: Vec<LogicalVolume> = parse_listing(&output).unwrap();
        assert_eq!(lvs.len(), 2);
        assert_eq!(lvs[1].name, "two");

        let broken = format!("{good}\nWARNING: something odd\n");
        assert!(parse_listing::<LogicalVolume>(&broken).is_err());

        assert!(parse_listing::<LogicalVolume>("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn report_args_match_wire_format() {
        assert_eq!(
            report_args::<VolumeGroup>(),
            vec![
                "--units=b",
                "--separator=<:SEP:>",
                "--nosuffix",
                "--noheadings",
                "-o",
                "vg_name,vg_size,vg_free,vg_uuid,vg_tags",
                "--nameprefixes",
                "-a",
            ]
        );
        assert_eq!(
            report_args::<LogicalVolume>()[5],
            "lv_name,lv_size,lv_uuid,lv_attr,copy_percent,lv_kernel_major,lv_kernel_minor,lv_tags"
        );
        assert_eq!(
            report_args::<PhysicalVolume>()[5],
            "pv_name,pv_size,pv_used,pv_free,pv_fmt,pv_uuid"
        );
    }

    #[test]
    fn second_field_requires_two_fields() {
        assert_eq!(
            second_field("pvs", "  /dev/sdb#vg0#lvm2#a--#1000#600\n").unwrap(),
            "vg0"
        );
        let error = second_field("vgs", "vg0").unwrap_err();
        assert!(matches!(error, LvmError::UnexpectedOutputShape { .. }));
        assert!(second_field("vgs", "").is_err());
    }
}
