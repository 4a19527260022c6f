//! Background stage: subtraction of a constant or a region estimate.

use super::traits::{Stage, StageId};
use crate::config::BackgroundConfig;
use crate::config::BackgroundCorrection;
use crate::data::{BackgroundAdjusted, Channel, Normalized};
use crate::error::{Feature, ReductionError};
use ndarray::Zip;

pub struct BackgroundStage<'a> {
    config: &'a BackgroundConfig,
}

impl<'a> BackgroundStage<'a> {
    pub fn new(config: &'a BackgroundConfig) -> Self {
        Self { config }
    }
}

impl Stage for BackgroundStage<'_> {
    type Input = Channel<Normalized>;
    type Output = Channel<BackgroundAdjusted>;

    fn id(&self) -> StageId {
        StageId::Background
    }

    fn process(&self, channel: Channel<Normalized>) -> Result<Self::Output, ReductionError> {
        let Normalized {
            resolution,
            normalisation,
            mut reflectivity,
        } = channel.state;
        let dataset = &channel.dataset;

        match &self.config.correction {
            None => {}
            Some(BackgroundCorrection::Constant(value)) => {
                reflectivity.r -= *value;
            }
            Some(BackgroundCorrection::DetectorRegion(_)) => {
                // estimate was taken from the frames during extraction
                Zip::from(&mut reflectivity.r)
                    .and(&dataset.background)
                    .and(&normalisation)
                    .for_each(|r, &bg, &norm| *r -= bg * norm);
                Zip::from(&mut reflectivity.dr)
                    .and(&dataset.background_err)
                    .and(&normalisation)
                    .for_each(|dr, &bg_err, &norm| {
                        *dr = dr.hypot(bg_err * norm);
                    });
            }
            Some(BackgroundCorrection::File(_)) => {
                return Err(ReductionError::Unimplemented(Feature::BackgroundFromFile));
            }
        }

        log::debug!("{}: channel {}", self.name(), dataset.polarization());
        Ok(Channel::new(
            channel.dataset,
            BackgroundAdjusted {
                resolution,
                reflectivity,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::{make_header, make_measurement};
    use crate::data::{DataSet, Polarization, QResolution, Reflectivity, Region, Signal};
    use ndarray::array;
    use std::path::PathBuf;

    fn normalized() -> Channel<Normalized> {
        let signal = Signal {
            counts: array![100.0, 100.0],
            counts_err: array![10.0, 10.0],
            background: array![20.0, 40.0],
            background_err: array![3.0, 4.0],
        };
        let dataset = DataSet::new(
            make_header(),
            make_measurement(Polarization::Unpolarized),
            array![0.5, 1.0],
            array![1.0, 1.0],
            array![100.0, 100.0],
            signal,
        )
        .unwrap();
        Channel::new(
            dataset,
            Normalized {
                resolution: QResolution {
                    q: array![0.0, 0.0],
                    dq: array![0.0, 0.0],
                },
                normalisation: array![0.01, 0.01],
                reflectivity: Reflectivity {
                    r: array![1.0, 1.0],
                    dr: array![0.1, 0.1],
                },
            },
        )
    }

    #[test]
    fn test_constant_leaves_uncertainty() {
        let config = BackgroundConfig {
            correction: Some(BackgroundCorrection::Constant(0.25)),
        };
        let channel = BackgroundStage::new(&config).process(normalized()).unwrap();
        assert_eq!(channel.state.reflectivity.r, array![0.75, 0.75]);
        assert_eq!(channel.state.reflectivity.dr, array![0.1, 0.1]);
    }

    #[test]
    fn test_region_quadrature() {
        let config = BackgroundConfig {
            correction: Some(BackgroundCorrection::DetectorRegion(Region::new(0, 1, 0, 1))),
        };
        let channel = BackgroundStage::new(&config).process(normalized()).unwrap();
        let refl = &channel.state.reflectivity;

        assert!((refl.r[0] - 0.8).abs() < 1e-12);
        assert!((refl.r[1] - 0.6).abs() < 1e-12);
        assert!((refl.dr[0] - (0.01f64 + 0.0009).sqrt()).abs() < 1e-12);
        assert!((refl.dr[1] - (0.01f64 + 0.0016).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_is_identity() {
        let config = BackgroundConfig { correction: None };
        let channel = BackgroundStage::new(&config).process(normalized()).unwrap();
        assert_eq!(channel.state.reflectivity.r, array![1.0, 1.0]);
    }

    #[test]
    fn test_file_unimplemented() {
        let config = BackgroundConfig {
            correction: Some(BackgroundCorrection::File(PathBuf::from("bg.dat"))),
        };
        assert!(matches!(
            BackgroundStage::new(&config).process(normalized()),
            Err(ReductionError::Unimplemented(Feature::BackgroundFromFile))
        ));
    }
}
