//! FFI functions for reducing point-detector scans.

use super::types::{CArrayView, CReductionParams, CSampleGeometry, CSlitData, ReflStatus};
use crate::config::CorrectionParameters;
use crate::data::{DataSetMetadata, ExperimentData, PersonData, ReducedDataSet};
use crate::provider::{DeviceNames, MemoryProvider, MetadataProvider};
use crate::runtime::DataReduction;
use ndarray::Array1;
use std::ffi::{c_char, CStr};

/// Name of the point detector inside providers made by [`refl_provider_create`].
const POINT_DETECTOR: &str = "det";

/// Opaque handle to an in-memory provider.
pub type ProviderHandle = *mut MemoryProvider;

/// Reduced channels of one reduction.
pub struct ReflResult {
    datasets: Vec<ReducedDataSet>,
}

/// Opaque handle to a reduction result.
pub type ResultHandle = *mut ReflResult;

/// Create a single-channel provider from raw scan arrays.
///
/// `name` labels the scan in logs and may be null.
///
/// # Safety
/// Array pointers must be valid with `len` elements each; `slits`,
/// `sample` and `out_handle` must be valid.
#[no_mangle]
pub unsafe extern "C" fn refl_provider_create(
    name: *const c_char,
    theta: *const f64,
    counts: *const f64,
    monitor: *const f64,
    time: *const f64,
    len: usize,
    wavelength: f64,
    slits: *const CSlitData,
    sample: *const CSampleGeometry,
    out_handle: *mut ProviderHandle,
) -> ReflStatus {
    if theta.is_null()
        || counts.is_null()
        || monitor.is_null()
        || time.is_null()
        || slits.is_null()
        || sample.is_null()
        || out_handle.is_null()
    {
        return ReflStatus::NullPointer;
    }
    if len == 0 || !(wavelength.is_finite() && wavelength > 0.0) {
        return ReflStatus::InvalidArgument;
    }

    let name = if name.is_null() {
        "memory".to_string()
    } else {
        match CStr::from_ptr(name).to_str() {
            Ok(s) => s.to_string(),
            Err(_) => return ReflStatus::InvalidArgument,
        }
    };

    let column = |ptr: *const f64| Array1::from(std::slice::from_raw_parts(ptr, len).to_vec());
    let header = DataSetMetadata {
        owner: PersonData::new(""),
        experiment: ExperimentData::new("", "", chrono::Local::now().naive_local()),
        sample: (*sample).to_sample(&name),
    };
    let devices = DeviceNames::default();

    let provider = MemoryProvider::new(name, header, (*slits).into(), wavelength)
        .with_scan_column(&devices.theta, column(theta))
        .with_column(&devices.monitor, column(monitor))
        .with_column(&devices.time, column(time))
        .with_detector(POINT_DETECTOR, column(counts));

    *out_handle = Box::into_raw(Box::new(provider));
    ReflStatus::Ok
}

/// Free a provider handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn refl_provider_free(handle: ProviderHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Reduce all channels of a provider.
///
/// A null `params` uses the library defaults. On success the caller owns
/// the result and frees it with [`refl_result_free`].
///
/// # Safety
/// `provider` and `out_result` must be valid; `params` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn refl_reduce(
    provider: ProviderHandle,
    params: *const CReductionParams,
    out_result: *mut ResultHandle,
) -> ReflStatus {
    if provider.is_null() || out_result.is_null() {
        return ReflStatus::NullPointer;
    }

    let parameters = if params.is_null() {
        CorrectionParameters::default()
    } else {
        match CorrectionParameters::try_from(*params) {
            Ok(p) => p,
            Err(status) => return status,
        }
    };

    let provider = &*provider;
    let outcome = DataReduction::new(provider, &parameters).and_then(|r| r.reduce());
    match outcome {
        Ok(datasets) => {
            *out_result = Box::into_raw(Box::new(ReflResult { datasets }));
            ReflStatus::Ok
        }
        Err(err) => {
            log::error!("reduction of {} failed: {err}", provider.file_path());
            ReflStatus::from(&err)
        }
    }
}

/// Number of reduced channels in a result. A null handle has none.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn refl_result_dataset_count(result: ResultHandle) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result).datasets.len()
}

/// View one column of a reduced channel: 0 = Q, 1 = dQ, 2 = R, 3 = dR.
///
/// # Safety
/// `result` and `out_view` must be valid. The view stays valid until the
/// result is freed.
#[no_mangle]
pub unsafe extern "C" fn refl_result_column(
    result: ResultHandle,
    dataset: usize,
    column: u32,
    out_view: *mut CArrayView,
) -> ReflStatus {
    if result.is_null() || out_view.is_null() {
        return ReflStatus::NullPointer;
    }

    let Some(reduced) = (&(*result).datasets).get(dataset) else {
        return ReflStatus::InvalidArgument;
    };
    let values = match column {
        0 => &reduced.state.q,
        1 => &reduced.state.dq,
        2 => &reduced.state.r,
        3 => &reduced.state.dr,
        _ => return ReflStatus::InvalidArgument,
    };

    *out_view = values
        .as_slice()
        .map_or_else(CArrayView::empty, CArrayView::from_slice);
    ReflStatus::Ok
}

/// Free a result handle.
///
/// # Safety
/// Handle must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn refl_result_free(result: ResultHandle) {
    if !result.is_null() {
        drop(Box::from_raw(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::types::{REFL_ABSORPTION_NONE, REFL_BACKGROUND_NONE, REFL_INTENSITY_NONE};
    use std::ptr;

    const THETA: [f64; 3] = [0.3, 0.6, 0.9];
    const COUNTS: [f64; 3] = [100.0, 50.0, 25.0];
    const MONITOR: [f64; 3] = [1000.0, 1000.0, 1000.0];
    const TIME: [f64; 3] = [1.0, 1.0, 1.0];

    fn create(len: usize) -> (ReflStatus, ProviderHandle) {
        let slits = CSlitData {
            slit1_width: 1.0,
            slit2_width: 0.5,
            slit1_position: -2000.0,
            slit2_position: -500.0,
        };
        let sample = CSampleGeometry {
            length: 20.0,
            thickness: 0.5,
            height: 10.0,
        };
        let mut handle = ptr::null_mut();
        let status = unsafe {
            refl_provider_create(
                c"scan.dat".as_ptr(),
                THETA.as_ptr(),
                COUNTS.as_ptr(),
                MONITOR.as_ptr(),
                TIME.as_ptr(),
                len,
                4.7,
                &slits,
                &sample,
                &mut handle,
            )
        };
        (status, handle)
    }

    fn monitor_only() -> CReductionParams {
        CReductionParams {
            footprint: false,
            absorption_mode: REFL_ABSORPTION_NONE,
            time_normalisation: false,
            intensity_mode: REFL_INTENSITY_NONE,
            background_mode: REFL_BACKGROUND_NONE,
            ..Default::default()
        }
    }

    #[test]
    fn test_reduce_round_trip() {
        let (status, provider) = create(THETA.len());
        assert_eq!(status, ReflStatus::Ok);

        unsafe {
            let mut result = ptr::null_mut();
            assert_eq!(refl_reduce(provider, &monitor_only(), &mut result), ReflStatus::Ok);
            assert_eq!(refl_result_dataset_count(result), 1);

            let mut view = CArrayView::empty();
            assert_eq!(refl_result_column(result, 0, 2, &mut view), ReflStatus::Ok);
            let r = std::slice::from_raw_parts(view.data, view.len);
            assert_eq!(r.len(), 3);
            assert!((r[0] - 0.1).abs() < 1e-12);
            assert!((r[2] - 0.025).abs() < 1e-12);

            assert_eq!(
                refl_result_column(result, 0, 4, &mut view),
                ReflStatus::InvalidArgument
            );
            assert_eq!(
                refl_result_column(result, 1, 0, &mut view),
                ReflStatus::InvalidArgument
            );

            refl_result_free(result);
            refl_provider_free(provider);
        }
    }

    #[test]
    fn test_default_params_on_null() {
        let (_, provider) = create(THETA.len());
        unsafe {
            let mut result = ptr::null_mut();
            assert_eq!(refl_reduce(provider, ptr::null(), &mut result), ReflStatus::Ok);
            refl_result_free(result);
            refl_provider_free(provider);
        }
    }

    #[test]
    fn test_unavailable_correction_status() {
        let (_, provider) = create(THETA.len());
        let params = CReductionParams {
            polarisation: true,
            ..monitor_only()
        };
        unsafe {
            let mut result = ptr::null_mut();
            assert_eq!(
                refl_reduce(provider, &params, &mut result),
                ReflStatus::Unimplemented
            );
            assert!(result.is_null());
            refl_provider_free(provider);
        }
    }

    #[test]
    fn test_null_and_empty_inputs() {
        let (status, handle) = create(0);
        assert_eq!(status, ReflStatus::InvalidArgument);
        assert!(handle.is_null());

        unsafe {
            let mut result = ptr::null_mut();
            assert_eq!(
                refl_reduce(ptr::null_mut(), ptr::null(), &mut result),
                ReflStatus::NullPointer
            );
            assert_eq!(refl_result_dataset_count(ptr::null_mut()), 0);
            refl_provider_free(ptr::null_mut());
            refl_result_free(ptr::null_mut());
        }
    }
}
