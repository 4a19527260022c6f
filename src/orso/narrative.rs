//! Provenance narrative: one sentence per applied reduction step.

use crate::config::{
    AbsorptionSource, BackgroundCorrection, CorrectionParameters, IntensityNormalisation,
};

fn optional_region<T: std::fmt::Display>(region: Option<T>) -> String {
    region.map_or_else(|| "None".to_string(), |r| r.to_string())
}

/// Describe the reduction configured by `parameters`, in pipeline order.
///
/// Numbers are written in shortest round-trip form (`1.0`, `1e-12`).
pub fn corrections(parameters: &CorrectionParameters) -> Vec<String> {
    let mut out = Vec::new();

    let source = &parameters.data_source;
    out.push(match source.region {
        Some(region) => format!(
            "Collect intensity from {} from region {}",
            source.detector, region
        ),
        None => format!("Collect intensity from {}", source.detector),
    });

    let reduction = &parameters.reduction;
    if reduction.footprint {
        out.push("Made foot print correction with trapezoid beam".to_string());
    }
    if reduction.polarisation {
        out.push("Made polarisation correction".to_string());
    }
    match reduction.absorption {
        Some(AbsorptionSource::Value(mu)) => {
            out.push(format!("Made absorption correction with mu = {mu:?}"));
        }
        Some(AbsorptionSource::Material(material)) => out.push(format!(
            "Made absorption correction with mu({}) = {:?}",
            material.name(),
            material.mu()
        )),
        None => {}
    }

    let normalisation = &parameters.normalisation;
    if normalisation.time {
        out.push("Made time normalisation".to_string());
    }
    if normalisation.monitor {
        out.push("Made monitor counts normalisation".to_string());
    }
    if let Some(mode) = &normalisation.intensity {
        let how = match mode {
            IntensityNormalisation::Constant(value) => format!("constant value {value:?}"),
            IntensityNormalisation::DatasetMaximum => {
                "maximum intensity point in current dataset".to_string()
            }
            IntensityNormalisation::GlobalMaximum => {
                "maximum intensity point of all datasets".to_string()
            }
            IntensityNormalisation::DetectorRegion { point, region } => format!(
                "from special point ({point}) in region of detector {}",
                optional_region(*region)
            ),
        };
        out.push(format!("Made intensity normalisation by {how}"));
    }

    if let Some(mode) = &parameters.background.correction {
        let how = match mode {
            BackgroundCorrection::Constant(value) => format!("with constant value {value:?}"),
            BackgroundCorrection::File(path) => format!("from file {}", path.display()),
            BackgroundCorrection::DetectorRegion(region) => {
                format!("from PSD in region {region}")
            }
        };
        out.push(format!("Made background correction {how}"));
    }

    out.push("Calculate Q from Angle".to_string());
    out.push(format!(
        "Calculate dQ from Slit parameters and delta lambda / lambda = {:.1}%",
        parameters.wavelength_resolution * 100.0
    ));
    out.push("Calculate dR like Poisson distribution".to_string());
    out
}
