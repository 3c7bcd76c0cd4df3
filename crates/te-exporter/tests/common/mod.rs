//! Scripted fake Telnet device for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};

use te_core::config::{DescriptorRegistry, ExporterConfig};
use te_exporter::{Exporter, TcpConnector};

pub const PROMPT: &str = "device#";

/// Offered at connect time when negotiation is enabled: DO TERMINAL-TYPE, WILL ECHO
pub const OFFERED_OPTIONS: [u8; 6] = [255, 253, 24, 255, 251, 1];

/// What a device saw over all its connections
#[derive(Debug, Clone, Default)]
pub struct DeviceLog {
    /// Accepted connections
    pub connections: usize,
    /// Received commands tagged with the connection number
    pub commands: Vec<(usize, String)>,
    /// Username and password pairs received during login
    pub credentials: Vec<(String, String)>,
    /// Negotiation triples received from the client
    pub negotiations: Vec<[u8; 3]>,
}

/// Behaviour of a fake device
#[derive(Debug, Clone, Default)]
pub struct DeviceScript {
    /// Send option offers before the banner
    pub negotiate: bool,
    /// Ask for a login before showing the prompt
    pub login: bool,
    /// Output for known commands; unknown commands get no answer
    pub replies: HashMap<String, String>,
}

impl DeviceScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(command.to_string(), output.to_string());
        self
    }

    pub fn with_login(mut self) -> Self {
        self.login = true;
        self
    }

    pub fn with_negotiation(mut self) -> Self {
        self.negotiate = true;
        self
    }
}

/// A running fake device
pub struct FakeDevice {
    pub port: u16,
    log: Arc<Mutex<DeviceLog>>,
}

impl FakeDevice {
    /// Bind to a free port on 127.0.0.1 and serve `script`
    pub async fn spawn(script: DeviceScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let log = Arc::new(Mutex::new(DeviceLog::default()));
        let script = Arc::new(script);

        let accept_log = Arc::clone(&log);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let id = {
                    let mut log = accept_log.lock().unwrap();
                    log.connections += 1;
                    log.connections
                };
                tokio::spawn(serve(
                    socket,
                    id,
                    Arc::clone(&script),
                    Arc::clone(&accept_log),
                ));
            }
        });

        Self { port, log }
    }

    pub fn log(&self) -> DeviceLog {
        self.log.lock().unwrap().clone()
    }
}

async fn serve(socket: TcpStream, id: usize, script: Arc<DeviceScript>, log: Arc<Mutex<DeviceLog>>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);

    if script.negotiate && write.write_all(&OFFERED_OPTIONS).await.is_err() {
        return;
    }

    if script.login {
        if write.write_all(b"Welcome\r\nlogin: ").await.is_err() {
            return;
        }
        let Some(username) = read_line(&mut reader, &log).await else {
            return;
        };
        if write.write_all(b"Password: ").await.is_err() {
            return;
        }
        let Some(password) = read_line(&mut reader, &log).await else {
            return;
        };
        log.lock().unwrap().credentials.push((username, password));
        if write.write_all(format!("\r\n{}", PROMPT).as_bytes()).await.is_err() {
            return;
        }
    } else if write.write_all(PROMPT.as_bytes()).await.is_err() {
        return;
    }

    while let Some(command) = read_line(&mut reader, &log).await {
        log.lock().unwrap().commands.push((id, command.clone()));

        if let Some(output) = script.replies.get(&command) {
            let reply = format!("{}\r\n{}", output, PROMPT);
            if write.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

/// Read one line, recording and stripping negotiation triples
async fn read_line(reader: &mut BufReader<OwnedReadHalf>, log: &Mutex<DeviceLog>) -> Option<String> {
    let mut line = Vec::new();
    loop {
        let byte = reader.read_u8().await.ok()?;
        match byte {
            255 => {
                let command = reader.read_u8().await.ok()?;
                let option = reader.read_u8().await.ok()?;
                log.lock().unwrap().negotiations.push([255, command, option]);
            }
            b'\n' => return Some(String::from_utf8_lossy(&line).to_string()),
            b'\r' => {}
            other => line.push(other),
        }
    }
}

/// A port on 127.0.0.1 with nothing listening
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Build an exporter dialing real TCP from a TOML configuration
pub fn exporter(config: &str) -> Exporter<TcpConnector> {
    let config: ExporterConfig = toml::from_str(config).unwrap();
    let mut registry = DescriptorRegistry::new().unwrap();
    let snapshot = config.compile(&mut registry).unwrap();
    Exporter::new(snapshot, registry, TcpConnector)
}
