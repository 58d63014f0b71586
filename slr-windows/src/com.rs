//! COM plumbing shared by the WASAPI streams and the device catalog.

use windows::core::{HSTRING, PWSTR};
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use slr_core::models::error::CaptureError;

/// Joins the calling thread to the multithreaded apartment until dropped.
pub(crate) struct ComScope;

impl ComScope {
    pub(crate) fn enter() -> Result<Self, CaptureError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;
        }
        Ok(Self)
    }
}

impl Drop for ComScope {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

pub(crate) fn device_enumerator() -> Result<IMMDeviceEnumerator, CaptureError> {
    unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|_| CaptureError::DeviceNotAvailable) }
}

/// Look up a rendering endpoint by its endpoint ID string.
pub(crate) fn render_device(enumerator: &IMMDeviceEnumerator, id: &str) -> Result<IMMDevice, CaptureError> {
    unsafe {
        enumerator
            .GetDevice(&HSTRING::from(id))
            .map_err(|_| CaptureError::DeviceNotFound(id.to_string()))
    }
}

pub(crate) fn device_id(device: &IMMDevice) -> Result<String, CaptureError> {
    unsafe {
        let raw = device
            .GetId()
            .map_err(|e| CaptureError::Unknown(format!("GetId failed: {}", e)))?;
        let id = take_co_string(raw);
        id.ok_or_else(|| CaptureError::Unknown("endpoint ID is not valid UTF-16".into()))
    }
}

/// Copy out and free a string allocated by COM.
unsafe fn take_co_string(raw: PWSTR) -> Option<String> {
    if raw.is_null() {
        return None;
    }
    let text = raw.to_string().ok();
    CoTaskMemFree(Some(raw.0 as *const _));
    text
}
