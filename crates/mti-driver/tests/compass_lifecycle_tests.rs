//! Compass 构造与关闭流程测试
//!
//! 用 MockController 验证每种构造失败的资源释放，以及关闭的幂等性和并发安全性。

mod common;

use common::{WAIT, wait_until};
use mti_device::{
    BaudRate, DataPacket, DeviceController, DeviceError, DeviceErrorKind, DeviceHandle, DeviceId,
    DeviceOptionFlags, MockCalls, MockController, PortInfo,
};
use mti_driver::{CompassBuilder, DriverError, LifecycleState, PathPolicy};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const DEVICE_ID: &str = "02782090";
const PORT: &str = "/dev/ttyUSB0";

fn builder() -> CompassBuilder {
    CompassBuilder::new(DEVICE_ID, PORT)
}

#[test]
fn test_discovery_failed_acquires_nothing() {
    let mock = MockController::new().without_ports();
    let handle = mock.handle();

    let err = builder().build(mock).unwrap_err();
    assert!(matches!(err, DriverError::DiscoveryFailed));

    let calls = handle.calls();
    assert_eq!(MockCalls::get(&calls.open_port), 0);
    assert_eq!(MockCalls::get(&calls.add_packet_callback), 0);
    assert_eq!(MockCalls::get(&calls.destruct), 0);
}

#[test]
fn test_strict_path_mismatch() {
    let mock = MockController::new().with_port("/dev/ttyUSB1", DEVICE_ID);
    let handle = mock.handle();

    let err = builder().build(mock).unwrap_err();
    match err {
        DriverError::PathMismatch { found, requested } => {
            assert_eq!(found, "/dev/ttyUSB1");
            assert_eq!(requested, PORT);
        },
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(MockCalls::get(&handle.calls().open_port), 0);
}

#[test]
fn test_lenient_path_policy_opens_discovered_port() {
    let mock = MockController::new().with_port("/dev/ttyUSB1", DEVICE_ID);
    let compass = builder()
        .path_policy(PathPolicy::Lenient)
        .build(mock)
        .unwrap();
    assert_eq!(compass.device().port, "/dev/ttyUSB1");
    compass.close().unwrap();
}

#[test]
fn test_unsupported_baud_rate_never_opens_port() {
    let mock = MockController::new();
    let handle = mock.handle();

    let err = builder().baud_rate(9600).build(mock).unwrap_err();
    assert!(matches!(err, DriverError::UnsupportedBaudRate(9600)));
    assert_eq!(MockCalls::get(&handle.calls().open_port), 0);
    assert_eq!(MockCalls::get(&handle.calls().destruct), 0);
}

#[test]
fn test_port_open_failed_destructs_controller() {
    let mock = MockController::new().fail_open_port();
    let handle = mock.handle();

    let err = builder().build(mock).unwrap_err();
    assert!(matches!(err, DriverError::PortOpenFailed { ref path, .. } if path == PORT));

    let calls = handle.calls();
    assert_eq!(MockCalls::get(&calls.destruct), 1);
    assert_eq!(MockCalls::get(&calls.add_packet_callback), 0);
}

#[test]
fn test_device_handle_not_found_destructs_controller() {
    let mock = MockController::new().without_device();
    let handle = mock.handle();

    let err = builder().build(mock).unwrap_err();
    assert!(matches!(err, DriverError::DeviceHandleNotFound(ref id) if id.as_str() == DEVICE_ID));

    let calls = handle.calls();
    assert_eq!(MockCalls::get(&calls.destruct), 1);
    assert_eq!(MockCalls::get(&calls.add_packet_callback), 0);
    assert_eq!(MockCalls::get(&calls.remove_packet_callback), 0);
}

#[test]
fn test_mode_transition_failed_releases_callback_and_controller() {
    let mock = MockController::new().fail_goto_measurement();
    let handle = mock.handle();

    let err = builder().build(mock).unwrap_err();
    assert!(matches!(err, DriverError::ModeTransitionFailed(_)));

    let calls = handle.calls();
    assert_eq!(MockCalls::get(&calls.add_packet_callback), 1);
    assert_eq!(MockCalls::get(&calls.remove_packet_callback), 1);
    assert_eq!(MockCalls::get(&calls.destruct), 1);
    assert_eq!(calls.polling_calls(), 0);
}

#[test]
fn test_option_flag_failure_is_not_fatal() {
    let mock = MockController::new().fail_option_flags();
    let handle = mock.handle();

    let compass = builder().build(mock).unwrap();
    assert_eq!(compass.state(), LifecycleState::Running);
    assert_eq!(MockCalls::get(&handle.calls().set_device_option_flags), 1);
    compass.close().unwrap();
}

#[test]
fn test_ingestion_updates_and_keeps_last_valid_heading() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = builder().build(mock).unwrap();

    assert!(compass.heading().is_nan());

    handle.push_yaw(42.5);
    assert!(wait_until(WAIT, || compass.heading() == 42.5));

    handle.push_packet(DataPacket::without_orientation());
    handle.push_yaw(f64::NAN);
    handle.push_error(DeviceError::new(DeviceErrorKind::InvalidPacket, "checksum"));
    assert!(wait_until(WAIT, || handle.pending() == 0));
    assert!(wait_until(WAIT, || compass.metrics().packet_errors == 1));
    assert_eq!(compass.heading(), 42.5);

    let metrics = compass.metrics();
    assert_eq!(metrics.packets_without_orientation, 1);
    assert_eq!(metrics.invalid_yaw_discarded, 1);

    handle.push_yaw(-90.0);
    assert!(wait_until(WAIT, || compass.heading() == -90.0));
    compass.close().unwrap();
}

#[test]
fn test_packets_applied_in_arrival_order() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = builder().build(mock).unwrap();

    for yaw in [1.0, 2.0, 3.0, 4.0, 5.0] {
        handle.push_yaw(yaw);
    }
    assert!(wait_until(WAIT, || handle.pending() == 0));
    assert!(wait_until(WAIT, || compass.heading() == 5.0));
    assert_eq!(compass.metrics().packets_total, 5);
    compass.close().unwrap();
}

#[test]
fn test_no_polling_after_close() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = builder().build(mock).unwrap();

    assert!(wait_until(WAIT, || handle.calls().polling_calls() > 0));
    compass.close().unwrap();

    let calls_at_close = handle.calls().polling_calls();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(handle.calls().polling_calls(), calls_at_close);
    assert!(!compass.is_running());
}

#[test]
fn test_close_is_idempotent() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = builder().build(mock).unwrap();

    for _ in 0..3 {
        compass.close().unwrap();
    }
    assert_eq!(MockCalls::get(&handle.calls().destruct), 1);
    assert_eq!(MockCalls::get(&handle.calls().remove_packet_callback), 1);
}

#[test]
fn test_concurrent_close_releases_once() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = Arc::new(builder().build(mock).unwrap());

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = Vec::new();
    for _ in 0..num_threads {
        let compass = compass.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            compass.close()
        }));
    }

    for h in handles {
        assert!(h.join().unwrap().is_ok());
    }
    assert_eq!(compass.state(), LifecycleState::Closed);
    assert_eq!(MockCalls::get(&handle.calls().destruct), 1);
    assert_eq!(MockCalls::get(&handle.calls().remove_packet_callback), 1);
}

#[test]
fn test_heading_reads_during_close() {
    let mock = MockController::new();
    let handle = mock.handle();
    let compass = Arc::new(builder().build(mock).unwrap());
    handle.push_yaw(33.0);
    assert!(wait_until(WAIT, || compass.heading() == 33.0));

    let reader = {
        let compass = compass.clone();
        thread::spawn(move || {
            for _ in 0..1000 {
                let heading = compass.heading();
                assert_eq!(heading, 33.0);
            }
        })
    };
    compass.close().unwrap();
    reader.join().unwrap();
}

/// 每次轮询都很慢的控制器（模拟卡在原生调用里的 SDK）
struct SlowController {
    inner: MockController,
    poll_delay: Duration,
}

impl DeviceController for SlowController {
    fn scan_ports(&mut self) -> Result<Vec<PortInfo>, DeviceError> {
        self.inner.scan_ports()
    }

    fn open_port(&mut self, path: &str, baud_rate: BaudRate) -> Result<(), DeviceError> {
        self.inner.open_port(path, baud_rate)
    }

    fn resolve_device(&mut self, device_id: &DeviceId) -> Option<DeviceHandle> {
        self.inner.resolve_device(device_id)
    }

    fn set_device_option_flags(
        &mut self,
        device: &DeviceHandle,
        enable: DeviceOptionFlags,
        disable: DeviceOptionFlags,
    ) -> Result<(), DeviceError> {
        self.inner.set_device_option_flags(device, enable, disable)
    }

    fn add_packet_callback(&mut self, device: &DeviceHandle) {
        self.inner.add_packet_callback(device)
    }

    fn goto_measurement(&mut self, device: &DeviceHandle) -> Result<(), DeviceError> {
        self.inner.goto_measurement(device)
    }

    fn packet_available(&mut self) -> bool {
        thread::sleep(self.poll_delay);
        self.inner.packet_available()
    }

    fn next_packet(&mut self) -> Result<DataPacket, DeviceError> {
        self.inner.next_packet()
    }

    fn remove_packet_callback(&mut self) {
        self.inner.remove_packet_callback()
    }

    fn destruct(&mut self) {
        self.inner.destruct()
    }
}

#[test]
fn test_join_timeout_still_releases_once_loop_exits() {
    let mock = MockController::new();
    let handle = mock.handle();
    let slow = SlowController {
        inner: mock,
        poll_delay: Duration::from_millis(300),
    };
    let compass = builder()
        .join_timeout(Duration::from_millis(20))
        .build(slow)
        .unwrap();

    // 第一次慢轮询返回后，IO 线程在 1ms 内进入下一次慢轮询
    assert!(wait_until(WAIT, || handle.calls().polling_calls() > 0));
    thread::sleep(Duration::from_millis(50));

    let err = compass.close().unwrap_err();
    assert!(matches!(err, DriverError::IoThread(_)), "{:?}", err);
    assert_eq!(compass.state(), LifecycleState::Closed);

    // 慢轮询返回后，IO 线程自己释放控制器
    let calls = handle.calls();
    assert!(wait_until(WAIT, || MockCalls::get(&calls.destruct) == 1));
    assert_eq!(MockCalls::get(&calls.remove_packet_callback), 1);

    // 再次关闭和 drop 都不会重复释放
    compass.close().unwrap();
    drop(compass);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(MockCalls::get(&calls.remove_packet_callback), 1);
    assert_eq!(MockCalls::get(&calls.destruct), 1);
}

#[test]
fn test_slow_poll_within_join_timeout_closes_cleanly() {
    let mock = MockController::new();
    let handle = mock.handle();
    let slow = SlowController {
        inner: mock,
        poll_delay: Duration::from_millis(30),
    };
    let compass = builder().build(slow).unwrap();
    assert!(wait_until(WAIT, || handle.calls().polling_calls() > 0));

    compass.close().unwrap();
    let calls = handle.calls();
    assert_eq!(MockCalls::get(&calls.remove_packet_callback), 1);
    assert_eq!(MockCalls::get(&calls.destruct), 1);
}

