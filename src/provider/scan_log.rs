//! NICOS ASCII scan files.
//!
//! A scan file is a sequence of `### Section` headers followed by
//! `# key : value` metadata lines. The `Scan data` section holds a
//! tab-separated table: a `#` column-name line, a `#` units line and one
//! row per scan point. A `;` column separates scanned devices (left) from
//! detectors (right).

use super::literal::Literal;
use super::{DeviceNames, MetadataProvider};
use crate::data::{ExperimentData, PersonData, SampleData, SlitData};
use crate::error::ProviderError;
use chrono::NaiveDateTime;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const GENERAL: &str = "General";
const EXPERIMENT: &str = "Experiment information";
const INSTRUMENT: &str = "Instrument setup";
const SAMPLE: &str = "Sample and alignment";
const DEVICE_STATE: &str = "Device positions and sample environment state";
const SCAN_DATA: &str = "Scan data";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR: &str = ";";

/// Parsed contents of a scan file.
#[derive(Clone, Debug, Default)]
pub struct ScanLog {
    metadata: BTreeMap<String, BTreeMap<String, String>>,
    header: Vec<String>,
    units: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn strip_hashes(line: &str) -> &str {
    line.trim_matches(|c| c == '#' || c == ' ')
}

fn table_error(err: csv::Error) -> ProviderError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => ProviderError::LengthMismatch {
            name: match pos {
                Some(pos) => format!("scan table line {}", pos.line()),
                None => "scan table".to_string(),
            },
            expected: *expected_len as usize,
            actual: *len as usize,
        },
        _ => ProviderError::Table(err),
    }
}

impl ScanLog {
    /// Parse a scan file from any buffered reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ProviderError> {
        let mut log = ScanLog::default();
        let mut section: Option<String> = None;
        let mut table = String::new();

        for line in reader.lines() {
            let line = line?;
            if section.as_deref() == Some(SCAN_DATA) {
                table.push_str(&line);
                table.push('\n');
                continue;
            }

            let trimmed = line.trim();
            if trimmed.starts_with("###") {
                let name = strip_hashes(trimmed).trim();
                if name.starts_with("NICOS data file") {
                    if let Some((_, date)) = name.split_once(" at ") {
                        log.insert(GENERAL, "Date", date.trim());
                    }
                    section = Some(GENERAL.to_string());
                } else {
                    section = Some(name.to_string());
                }
                continue;
            }

            if let Some(entry) = trimmed.strip_prefix('#') {
                if let Some((key, value)) = entry.split_once(':') {
                    log.insert(
                        section.as_deref().unwrap_or(GENERAL),
                        key.trim(),
                        value.trim(),
                    );
                }
            }
        }

        log.read_table(table.as_bytes())?;

        if !log.header.iter().any(|h| h == SEPARATOR) {
            return Err(ProviderError::InvalidValue {
                key: "scan header".to_string(),
                value: log.header.join("\t"),
            });
        }

        log::debug!(
            "parsed scan log: {} columns, {} rows, {} metadata sections",
            log.header.len(),
            log.rows.len(),
            log.metadata.len()
        );
        Ok(log)
    }

    /// Read the tab-separated `Scan data` table.
    ///
    /// The first `#` line names the columns and the second gives units;
    /// every row must have as many fields as the column line.
    fn read_table(&mut self, table: &[u8]) -> Result<(), ProviderError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(false)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(table);

        for record in reader.records() {
            let record = record.map_err(table_error)?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let fields = record.iter().map(str::to_string);

            if record.get(0).is_some_and(|f| f.starts_with('#')) {
                let fields: Vec<String> = fields.map(|f| strip_hashes(&f).to_string()).collect();
                if self.header.is_empty() {
                    self.header = fields;
                } else if self.units.is_empty() {
                    self.units = fields;
                }
            } else if !self.header.is_empty() {
                self.rows.push(fields.collect());
            }
        }
        Ok(())
    }

    fn insert(&mut self, section: &str, key: &str, value: &str) {
        self.metadata
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn separator_index(&self) -> usize {
        self.header
            .iter()
            .position(|h| h == SEPARATOR)
            .unwrap_or(self.header.len())
    }

    /// Devices left of the separator.
    pub fn devices(&self) -> Vec<String> {
        self.header[..self.separator_index()].to_vec()
    }

    /// Columns right of the separator up to the first `file*` column.
    pub fn detectors(&self) -> Vec<String> {
        let start = (self.separator_index() + 1).min(self.header.len());
        let end = self
            .header
            .iter()
            .position(|h| h.starts_with("file"))
            .filter(|&end| end >= start)
            .unwrap_or(self.header.len());

        self.header[start..end]
            .iter()
            .filter(|h| h.as_str() != SEPARATOR)
            .cloned()
            .collect()
    }

    /// Metadata value of one section.
    pub fn metadata(&self, section: &str, key: &str) -> Result<&str, ProviderError> {
        self.metadata
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
            .ok_or_else(|| ProviderError::MissingMetadata {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Metadata value whose key carries `name` after the device prefix,
    /// e.g. `refl_instrument` for `instrument`.
    pub fn prefixed_metadata(&self, section: &str, name: &str) -> Result<&str, ProviderError> {
        self.metadata
            .get(section)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|(key, _)| key.split('_').nth(1) == Some(name))
                    .map(|(_, value)| value.as_str())
            })
            .ok_or_else(|| ProviderError::MissingMetadata {
                section: section.to_string(),
                key: name.to_string(),
            })
    }

    fn column_index(&self, name: &str) -> Result<usize, ProviderError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ProviderError::MissingColumn(name.to_string()))
    }

    /// Raw text of a column.
    pub fn text_column(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].clone()).collect())
    }

    /// Column parsed as numbers.
    pub fn numeric_column(&self, name: &str) -> Result<Array1<f64>, ProviderError> {
        let idx = self.column_index(name)?;
        self.rows
            .iter()
            .map(|row| {
                row[idx]
                    .parse::<f64>()
                    .map_err(|_| ProviderError::InvalidValue {
                        key: name.to_string(),
                        value: row[idx].clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from_vec)
    }

    /// Unit of a column, if the units line names one.
    pub fn unit(&self, name: &str) -> Option<&str> {
        let idx = self.column_index(name).ok()?;
        self.units
            .get(idx)
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }
}

/// Split `"<value> <unit> ..."` into its whitespace fields.
fn field<'a>(text: &'a str, index: usize, key: &str) -> Result<&'a str, ProviderError> {
    text.split_whitespace()
        .nth(index)
        .ok_or_else(|| ProviderError::InvalidValue {
            key: key.to_string(),
            value: text.to_string(),
        })
}

fn number(text: &str, index: usize, key: &str) -> Result<f64, ProviderError> {
    let raw = field(text, index, key)?;
    raw.parse().map_err(|_| ProviderError::InvalidValue {
        key: key.to_string(),
        value: text.to_string(),
    })
}

/// Provider over a parsed NICOS scan file.
#[derive(Clone, Debug)]
pub struct ScanLogProvider {
    path: String,
    devices: DeviceNames,
    log: ScanLog,
}

impl ScanLogProvider {
    /// Read and parse a scan file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let log = ScanLog::parse(BufReader::new(file))?;
        log::info!("loaded scan file {}", path.display());
        Ok(Self::new(path.display().to_string(), log))
    }

    pub fn new(path: impl Into<String>, log: ScanLog) -> Self {
        Self {
            path: path.into(),
            devices: DeviceNames::default(),
            log,
        }
    }

    pub fn with_devices(mut self, devices: DeviceNames) -> Self {
        self.devices = devices;
        self
    }

    pub fn log(&self) -> &ScanLog {
        &self.log
    }
}

impl MetadataProvider for ScanLogProvider {
    fn file_path(&self) -> &str {
        &self.path
    }

    fn devices(&self) -> &DeviceNames {
        &self.devices
    }

    fn detectors(&self) -> Vec<String> {
        self.log.detectors()
    }

    fn scan_devices(&self) -> Vec<String> {
        self.log.devices()
    }

    fn column(&self, name: &str) -> Result<Array1<f64>, ProviderError> {
        self.log.numeric_column(name)
    }

    fn state_column(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        self.log.text_column(name)
    }

    fn angle_unit(&self) -> String {
        self.log
            .unit(&self.devices.theta)
            .unwrap_or("deg")
            .to_string()
    }

    fn wavelength(&self) -> Result<(f64, String), ProviderError> {
        let key = "wavelength_value";
        let text = self.log.metadata(DEVICE_STATE, key)?;
        let value = number(text, 0, key)?;
        let unit = field(text, 1, key).unwrap_or("A");
        Ok((value, unit.to_string()))
    }

    fn slit_configuration(&self) -> Result<SlitData, ProviderError> {
        let [slit1, slit2] = &self.devices.slits;
        let width = |slit: &str| {
            let key = format!("{slit}_value");
            number(self.log.metadata(DEVICE_STATE, &key)?, 2, &key)
        };
        let position = |slit: &str| {
            let key = format!("d_{slit}_value");
            let text = self.log.metadata(DEVICE_STATE, &key)?;
            Ok::<_, ProviderError>((number(text, 0, &key)?, field(text, 1, &key).ok()))
        };

        let (slit1_position, units) = position(slit1.as_str())?;
        let (slit2_position, _) = position(slit2.as_str())?;

        let mut slits = SlitData::new(
            width(slit1.as_str())?,
            width(slit2.as_str())?,
            slit1_position,
            slit2_position,
        );
        if let Some(units) = units {
            slits.units = units.to_string();
        }
        Ok(slits)
    }

    fn owner(&self) -> Result<PersonData, ProviderError> {
        let users = self.log.metadata(EXPERIMENT, "Exp_users")?;

        if users.contains('{') && users.contains('}') {
            let parsed = Literal::parse(users)?;
            let user = match &parsed {
                Literal::List(items) => items.first().unwrap_or(&parsed),
                _ => &parsed,
            };
            let name = user.get("name").and_then(Literal::as_str).unwrap_or_default();
            let mut person = PersonData::new(name);
            person.contact = user
                .get("email")
                .and_then(Literal::as_str)
                .map(str::to_string);
            if let Some(affiliation) = user.get("affiliation").and_then(Literal::as_str) {
                person.affiliation = affiliation.to_string();
            }
            Ok(person)
        } else {
            let name = users.split(',').next().unwrap_or_default().trim();
            Ok(PersonData::new(name))
        }
    }

    fn experiment(&self) -> Result<ExperimentData, ProviderError> {
        let title = self.log.metadata(EXPERIMENT, "Exp_title")?;
        let instrument = self.log.prefixed_metadata(INSTRUMENT, "instrument")?;
        let date = self.log.metadata(GENERAL, "Date")?;
        let start_date = NaiveDateTime::parse_from_str(date, DATE_FORMAT).map_err(|_| {
            ProviderError::InvalidValue {
                key: "Date".to_string(),
                value: date.to_string(),
            }
        })?;

        let mut experiment = ExperimentData::new(title, instrument, start_date);
        experiment.proposal_id = self
            .log
            .metadata(EXPERIMENT, "Exp_proposal")
            .ok()
            .map(str::to_string);
        experiment.doi = self
            .log
            .prefixed_metadata(INSTRUMENT, "doi")
            .ok()
            .map(str::to_string);
        Ok(experiment)
    }

    fn sample(&self) -> Result<SampleData, ProviderError> {
        let name = self.log.prefixed_metadata(SAMPLE, "samplename")?;
        let Ok(samples) = self.log.prefixed_metadata(SAMPLE, "samples") else {
            return Ok(SampleData::new(name));
        };

        let parsed = Literal::parse(samples)?;
        let table = match &parsed {
            Literal::List(items) => items.first().unwrap_or(&parsed),
            _ => &parsed,
        };
        let entry = table
            .values()
            .into_iter()
            .find(|s| s.get("name").and_then(Literal::as_str) == Some(name));

        let Some(entry) = entry else {
            log::warn!("sample '{name}' not described in sample table, using bare name");
            return Ok(SampleData::new(name));
        };

        let text = |key: &str| entry.get(key).and_then(Literal::as_str).map(str::to_string);
        let dim = |key: &str| entry.get(key).and_then(Literal::as_f64).unwrap_or(0.0);

        let mut sample = SampleData::new(name).with_dimensions(
            dim("length"),
            dim("thickness"),
            dim("height"),
        );
        sample.category = text("category");
        sample.composition = text("composition");
        sample.description = text("description");
        Ok(sample)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::Polarization;
    use std::io::Cursor;

    pub(crate) const SCAN_FILE: &str = "\
### NICOS data file, created at 2024-03-01 12:30:00
### Experiment information
#          Exp_title : Layer study
#          Exp_users : {'name': 'J. Doe', 'email': 'j.doe@example.org'}
#       Exp_proposal : 12345
### Instrument setup
#    refl_instrument : MARIA
#           refl_doi : 10.1234/abcd
### Sample and alignment
#  Sample_samplename : Si wafer
#     Sample_samples : {1: {'name': 'Si wafer', 'category': 'film', 'length': 20.0, 'thickness': 0.5, 'height': 10.0}}
### Device positions and sample environment state
#   wavelength_value : 4.7 A
#        slit1_value : 0.0 0.0 1.0 10.0 mm
#        slit2_value : 0.0 0.0 0.5 10.0 mm
#      d_slit1_value : -2000.0 mm
#      d_slit2_value : -500.0 mm
### Scan data
# theta\tsf1\t;\tdet\tmon1\ttimer\tfile
# deg\t\t;\tcts\tcts\ts\t
0.2\toff\t;\t120\t1000\t1.0\tscan_001
0.2\ton\t;\t80\t1000\t1.0\tscan_002
0.4\toff\t;\t60\t1000\t1.0\tscan_003
0.4\ton\t;\t40\t1000\t1.0\tscan_004
";

    pub(crate) fn scan_provider() -> ScanLogProvider {
        let log = ScanLog::parse(Cursor::new(SCAN_FILE)).unwrap();
        ScanLogProvider::new("scan.dat", log)
    }

    #[test]
    fn test_devices_and_detectors() {
        let provider = scan_provider();
        assert_eq!(provider.scan_devices(), vec!["theta", "sf1"]);
        assert_eq!(provider.detectors(), vec!["det", "mon1", "timer"]);
        assert_eq!(provider.angle_unit(), "deg");
    }

    #[test]
    fn test_channels_and_filtering() {
        let provider = scan_provider();
        assert_eq!(
            provider.polarisations(),
            vec![Polarization::Mo, Polarization::Po]
        );
        let po = provider.channel_column("det", Polarization::Po).unwrap();
        assert_eq!(po.to_vec(), vec![120.0, 60.0]);
        let mo = provider.channel_theta(Polarization::Mo).unwrap();
        assert_eq!(mo.to_vec(), vec![0.2, 0.4]);
    }

    #[test]
    fn test_provenance() {
        let provider = scan_provider();

        let owner = provider.owner().unwrap();
        assert_eq!(owner.name, "J. Doe");
        assert_eq!(owner.contact.as_deref(), Some("j.doe@example.org"));

        let experiment = provider.experiment().unwrap();
        assert_eq!(experiment.instrument, "MARIA");
        assert_eq!(experiment.proposal_id.as_deref(), Some("12345"));
        assert_eq!(experiment.doi.as_deref(), Some("10.1234/abcd"));
        assert_eq!(
            experiment.start_date.format(DATE_FORMAT).to_string(),
            "2024-03-01 12:30:00"
        );

        let sample = provider.sample().unwrap();
        assert_eq!(sample.category.as_deref(), Some("film"));
        assert_eq!((sample.length, sample.thickness), (20.0, 0.5));
    }

    #[test]
    fn test_slits_read_from_own_entries() {
        let slits = scan_provider().slit_configuration().unwrap();
        assert_eq!(slits.slit1_width, 1.0);
        assert_eq!(slits.slit2_width, 0.5);
        assert_eq!(slits.separation(), 1500.0);
        assert_eq!(slits.units, "mm");

        let (wl, unit) = scan_provider().wavelength().unwrap();
        assert_eq!((wl, unit.as_str()), (4.7, "A"));
    }

    #[test]
    fn test_plain_user_list() {
        let text = SCAN_FILE.replace(
            "{'name': 'J. Doe', 'email': 'j.doe@example.org'}",
            "J. Doe, A. Other",
        );
        let log = ScanLog::parse(Cursor::new(text)).unwrap();
        let owner = ScanLogProvider::new("scan.dat", log).owner().unwrap();
        assert_eq!(owner.name, "J. Doe");
        assert_eq!(owner.contact, None);
    }

    #[test]
    fn test_table_units_and_blank_lines() {
        let text = SCAN_FILE.replace("0.4\toff", "\n0.4\toff");
        let log = ScanLog::parse(Cursor::new(text)).unwrap();

        assert_eq!(log.unit("det"), Some("cts"));
        assert_eq!(log.unit("sf1"), None);
        assert_eq!(log.text_column("file").unwrap().len(), 4);
        assert_eq!(
            log.numeric_column("det").unwrap().to_vec(),
            vec![120.0, 80.0, 60.0, 40.0]
        );
    }

    #[test]
    fn test_ragged_row_rejected() {
        let text = format!("{SCAN_FILE}0.6\toff\t;\t1\n");
        let err = ScanLog::parse(Cursor::new(text)).unwrap_err();
        assert!(matches!(err, ProviderError::LengthMismatch { expected: 7, actual: 4, .. }));
    }

    #[test]
    fn test_missing_separator_rejected() {
        let err = ScanLog::parse(Cursor::new("### Scan data\n# theta\tdet\n0.1\t1\n")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidValue { .. }));
    }
}
