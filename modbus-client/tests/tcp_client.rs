//! Loopback tests for ModbusTcpClient against a tiny scripted Modbus TCP responder.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use modbus_client::{ModbusError, ModbusTcpClient, RegisterTransport};

const ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Serve Modbus TCP requests on one connection until the client hangs up.
///
/// Reads of address 40001 answer with `0x0102`, reads of address 9999 answer
/// with an illegal-data-address exception, reads of 40100 answer one register
/// short and all other reads answer with zeros. Write-multiple requests are
/// acknowledged and their payload is forwarded on `writes`.
fn serve(mut stream: TcpStream, writes: mpsc::Sender<(u16, Vec<u16>)>) {
    loop {
        let mut header = [0u8; 7];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        let mut pdu = vec![0u8; length - 1];
        if stream.read_exact(&mut pdu).is_err() {
            return;
        }

        let function = pdu[0];
        let address = u16::from_be_bytes([pdu[1], pdu[2]]);
        let quantity = u16::from_be_bytes([pdu[3], pdu[4]]);

        let response_pdu = match function {
            0x03 if address == 9999 => vec![0x83, ILLEGAL_DATA_ADDRESS],
            0x03 => {
                let words: Vec<u16> = match address {
                    40001 => vec![0x0102],
                    40100 => vec![0; usize::from(quantity) - 1],
                    _ => vec![0; usize::from(quantity)],
                };
                let mut pdu = vec![0x03, (words.len() * 2) as u8];
                for word in words {
                    pdu.extend_from_slice(&word.to_be_bytes());
                }
                pdu
            }
            0x10 => {
                let values = pdu[6..]
                    .chunks(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                let _ = writes.send((address, values));
                let mut pdu = vec![0x10];
                pdu.extend_from_slice(&address.to_be_bytes());
                pdu.extend_from_slice(&quantity.to_be_bytes());
                pdu
            }
            other => vec![other | 0x80, 0x01],
        };

        let mut frame = Vec::with_capacity(7 + response_pdu.len());
        frame.extend_from_slice(&header[0..4]);
        frame.extend_from_slice(&((response_pdu.len() + 1) as u16).to_be_bytes());
        frame.push(header[6]);
        frame.extend_from_slice(&response_pdu);
        if stream.write_all(&frame).is_err() {
            return;
        }
    }
}

fn start_responder() -> (u16, mpsc::Receiver<(u16, Vec<u16>)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (write_tx, write_rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let writes = write_tx.clone();
                    thread::spawn(move || serve(stream, writes));
                }
                Err(_) => return,
            }
        }
    });

    (port, write_rx)
}

fn connected_client(port: u16) -> ModbusTcpClient {
    let mut client = ModbusTcpClient::new("127.0.0.1", port, Duration::from_secs(3));
    client.connect().unwrap();
    client
}

#[test]
fn test_read_holding_registers() {
    let (port, _writes) = start_responder();
    let mut client = connected_client(port);

    assert!(client.is_connected());
    let words = client.read_holding_registers(1, 40001, 1).unwrap();
    assert_eq!(words, vec![0x0102]);

    let words = client.read_holding_registers(1, 40003, 16).unwrap();
    assert_eq!(words.len(), 16);
}

#[test]
fn test_exception_response_is_reported() {
    let (port, _writes) = start_responder();
    let mut client = connected_client(port);

    match client.read_holding_registers(1, 9999, 1) {
        Err(ModbusError::Exception(code)) => assert_eq!(code, ILLEGAL_DATA_ADDRESS),
        other => panic!("Expected exception response, got {:?}", other),
    }

    // An exception does not cost us the connection
    assert!(client.is_connected());
    assert!(client.read_holding_registers(1, 40001, 1).is_ok());
}

#[test]
fn test_short_response_is_rejected() {
    let (port, _writes) = start_responder();
    let mut client = connected_client(port);

    match client.read_holding_registers(1, 40100, 4) {
        Err(ModbusError::InvalidResponse { expected, actual }) => {
            assert_eq!(expected, 4);
            assert_eq!(actual, 3);
        }
        other => panic!("Expected a rejected response, got {:?}", other),
    }

    // The socket is still in sync and usable
    assert!(client.is_connected());
    assert_eq!(client.read_holding_registers(1, 40001, 1).unwrap(), vec![0x0102]);
}

/// Accept connections and read requests without ever answering
fn start_silent_responder() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                return;
            };
            thread::spawn(move || {
                let mut buf = [0u8; 260];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        return;
                    }
                }
            });
        }
    });

    port
}

#[test]
fn test_request_timeout_drops_connection() {
    let port = start_silent_responder();
    let timeout = Duration::from_millis(200);
    let mut client = ModbusTcpClient::new("127.0.0.1", port, timeout);
    client.connect().unwrap();

    let started = Instant::now();
    let result = client.read_holding_registers(1, 40001, 1);
    let elapsed = started.elapsed();

    match result {
        Err(ModbusError::Timeout(after)) => assert_eq!(after, timeout),
        other => panic!("Expected a timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(150), "returned after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "returned after {:?}", elapsed);

    assert!(!client.is_connected());
    assert!(matches!(
        client.read_holding_registers(1, 40001, 1),
        Err(ModbusError::NotConnected)
    ));
}

#[test]
fn test_write_timeout_drops_connection() {
    let port = start_silent_responder();
    let mut client = ModbusTcpClient::new("127.0.0.1", port, Duration::from_millis(200));
    client.connect().unwrap();

    assert!(matches!(
        client.write_registers(1, 40200, &[1]),
        Err(ModbusError::Timeout(_))
    ));
    assert!(!client.is_connected());
}

#[test]
fn test_write_registers() {
    let (port, writes) = start_responder();
    let mut client = connected_client(port);

    client.write_registers(1, 40200, &[0x4500, 0x0000]).unwrap();

    let (address, values) = writes.recv_timeout(Duration::from_secs(3)).unwrap();
    assert_eq!(address, 40200);
    assert_eq!(values, vec![0x4500, 0x0000]);
}

#[test]
fn test_connect_refused() {
    // Bind and immediately drop to find a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = ModbusTcpClient::new("127.0.0.1", port, Duration::from_secs(3));
    let result = client.connect();

    assert!(matches!(result, Err(ModbusError::Connection(_))));
    assert!(!client.is_connected());
}

#[test]
fn test_close_then_read() {
    let (port, _writes) = start_responder();
    let mut client = connected_client(port);

    client.close();
    assert!(!client.is_connected());
    assert!(matches!(
        client.read_holding_registers(1, 40001, 1),
        Err(ModbusError::NotConnected)
    ));

    // Reconnect works after close
    client.connect().unwrap();
    assert_eq!(client.read_holding_registers(1, 40001, 1).unwrap(), vec![0x0102]);
}
