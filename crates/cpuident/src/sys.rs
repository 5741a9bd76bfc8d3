//! OS reported processor information

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        use windows::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

        pub(crate) fn logical_processor_count() -> usize {
            let mut sys_info = SYSTEM_INFO::default();
            unsafe { GetSystemInfo(&mut sys_info) };
            (sys_info.dwNumberOfProcessors as usize).max(1)
        }
    } else {
        pub(crate) fn logical_processor_count() -> usize {
            std::thread::available_parallelism().map_or(1, |count| count.get())
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn at_least_one_processor() {
        assert!(super::logical_processor_count() >= 1);
    }
}
