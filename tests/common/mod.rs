#![allow(dead_code)]

use await_resources::dispatch::{self, Resource};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Builds resources from locator strings, panicking on configuration errors.
pub fn resources(locators: &[&str]) -> Vec<Resource> {
    dispatch::build_from_strings(locators).expect("valid locators")
}

/// A loopback listener kept open for the lifetime of the returned value.
pub fn open_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    (listener, addr)
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let (listener, addr) = open_listener();
    drop(listener);
    addr.port()
}

#[derive(Clone, Default)]
pub struct LogBuffer {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        let guard = self.buffer.lock().expect("log buffer lock");
        String::from_utf8_lossy(&guard).into_owned()
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogGuard;

    fn make_writer(&'a self) -> Self::Writer {
        LogGuard {
            buffer: self.buffer.clone(),
        }
    }
}

pub struct LogGuard {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl std::io::Write for LogGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.buffer.lock().expect("log buffer lock");
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
