use burn::backend::libtorch::LibTorchDevice;

/// Pick the device for the whole run: the first CUDA device when one is usable, the CPU
/// otherwise
pub fn select_device() -> LibTorchDevice {
    if tch::Cuda::is_available() {
        log::info!("Using CUDA device 0 ({} visible)", tch::Cuda::device_count());
        LibTorchDevice::Cuda(0)
    } else {
        log::info!("CUDA unavailable, using the CPU");
        LibTorchDevice::Cpu
    }
}

/// Whether gradients should be loss-scaled on this device
pub fn is_accelerator(device: &LibTorchDevice) -> bool {
    matches!(device, LibTorchDevice::Cuda(_))
}
