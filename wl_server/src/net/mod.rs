//! Networking. A single poll loop owns every socket: it accepts connections,
//! reads and frames inbound bytes, and drains each connection's outbound
//! queue. Everything else in the server talks to a connection through its
//! [`ConnSender`], which wakes the poll loop after queueing a packet, so
//! each peer has exactly one writer and per-peer packet order is the order
//! packets were queued.

use crate::{player::Player, world::World};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use mio::{
  net::{TcpListener, TcpStream},
  Events, Interest, Poll, Token, Waker,
};
use std::{
  collections::HashMap,
  fmt, io,
  io::{Read, Write},
  net::SocketAddr,
  sync::Arc,
};
use thiserror::Error;
use wl_common::util::{self, Buffer, BufferError, Chat, UUID};

pub mod cb;
pub mod packet;
pub mod sb;
pub mod status;

pub use status::PROTOCOL_VERSION;

/// The largest frame we will accept. This is about 2 mb, the same limit the
/// vanilla server uses.
const MAX_PACKET_SIZE: usize = 0x1fffff;

/// How many packets can sit in a connection's outbound queue. A full 8 chunk
/// view window is 289 chunk packets, so this allows a join plus plenty of
/// slack; a client too slow to drain this much is dropped.
const OUTBOUND_LIMIT: usize = 512;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
  Handshake,
  Status,
  Login,
  Play,
}

/// Anything that kills a connection: a transport failure, or a protocol
/// violation by the client.
#[derive(Error, Debug)]
pub enum Error {
  #[error("unexpected packet {id:#04x} in {state:?}")]
  UnexpectedPacket { id: i32, state: State },
  #[error("bad next state {0}")]
  BadNextState(i32),
  #[error("frame length {0} out of range")]
  FrameLength(i32),
  #[error("overlong length varint")]
  LenVarint,
  #[error("{0}")]
  Buffer(#[from] BufferError),
  #[error("{0}")]
  IO(#[from] io::Error),
}

impl Error {
  fn io_kind(&self) -> Option<io::ErrorKind> {
    match self {
      Self::IO(e) => Some(e.kind()),
      _ => None,
    }
  }
}

pub enum WakeEvent {
  /// Packets were queued for this connection.
  Clientbound(Token),
  /// Flush and drop this connection.
  Close(Token),
  /// Stop accepting and tear down the listener.
  Shutdown,
}

/// The write half of a connection, handed to the player, the world, and any
/// thread that wants to talk to this client.
pub struct ConnSender {
  tx:    Sender<cb::Packet>,
  wake:  Sender<WakeEvent>,
  waker: Arc<Waker>,
  tok:   Token,
}

impl Clone for ConnSender {
  fn clone(&self) -> Self {
    ConnSender {
      tx:    self.tx.clone(),
      wake:  self.wake.clone(),
      waker: self.waker.clone(),
      tok:   self.tok,
    }
  }
}

impl fmt::Debug for ConnSender {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("ConnSender").field("tok", &self.tok).finish()
  }
}

/// Lets the world shut the listener down (`/stop`).
pub struct NetHandle {
  wake:  Sender<WakeEvent>,
  waker: Arc<Waker>,
}

impl NetHandle {
  pub fn shutdown(&self) {
    let _ = self.wake.send(WakeEvent::Shutdown);
    let _ = self.waker.wake();
  }
}

impl ConnSender {
  #[cfg(test)]
  pub(crate) fn mock(poll: &Poll) -> (Receiver<cb::Packet>, ConnSender) {
    // mio only allows a single `Waker` to be registered per `Poll`, so tests
    // that mock more than one connection on the same `Poll` must share one,
    // same as `ConnectionManager::run` shares a single waker across every
    // real connection.
    thread_local! {
      static WAKERS: std::cell::RefCell<HashMap<usize, Arc<Waker>>> = std::cell::RefCell::new(HashMap::new());
    }
    const WAKE: Token = Token(0xfffffffe);

    let (tx, rx) = crossbeam_channel::unbounded();
    let (wake_tx, _wake_rx) = crossbeam_channel::unbounded();
    let key = poll.registry() as *const _ as usize;
    let waker = WAKERS.with(|w| {
      w.borrow_mut()
        .entry(key)
        .or_insert_with(|| Arc::new(Waker::new(poll.registry(), WAKE).unwrap()))
        .clone()
    });
    (rx, ConnSender { tx, wake: wake_tx, waker, tok: Token(0) })
  }

  /// Queues the packet and wakes the poll loop. Never blocks: a connection
  /// whose queue is full is dropped (it is hopelessly behind), and a closed
  /// connection just swallows the packet.
  pub fn send(&self, p: cb::Packet) {
    match self.tx.try_send(p) {
      Ok(()) => {
        let _ = self.wake.send(WakeEvent::Clientbound(self.tok));
        let _ = self.waker.wake();
      }
      Err(TrySendError::Full(_)) => {
        warn!("outbound queue full, dropping connection");
        self.close();
      }
      Err(TrySendError::Disconnected(_)) => {}
    }
  }

  /// Asks the poll loop to flush and close this connection.
  pub fn close(&self) {
    let _ = self.wake.send(WakeEvent::Close(self.tok));
    let _ = self.waker.wake();
  }
}

pub struct Connection {
  stream: TcpStream,
  state:  State,
  ver:    i32,
  /// Set once the login succeeded and the player is in the world.
  player: Option<Arc<Player>>,
  /// Set when this side decided the conversation is over (status served, or
  /// a pre-play error was answered) and the connection should be flushed
  /// and dropped.
  done:   bool,

  tx:    Sender<cb::Packet>,
  rx:    Receiver<cb::Packet>,
  wake:  Sender<WakeEvent>,
  waker: Arc<Waker>,
  tok:   Token,

  incoming: Vec<u8>,
  outgoing: Vec<u8>,
  garbage:  Vec<u8>,
}

impl fmt::Debug for Connection {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.debug_struct("Connection").field("state", &self.state).field("done", &self.done).finish()
  }
}

/// Splits one length-prefixed frame off the front of `incoming`. Returns
/// `None` if a full frame hasn't arrived yet; errors on an overlong varint
/// or an oversized frame.
fn split_frame(incoming: &mut Vec<u8>) -> Result<Option<Vec<u8>>, Error> {
  let (len, read) = util::read_varint(incoming);
  if read < 0 {
    return Err(Error::LenVarint);
  }
  if read == 0 {
    return Ok(None);
  }
  let read = read as usize;
  if len < 0 || len as usize > MAX_PACKET_SIZE {
    return Err(Error::FrameLength(len));
  }
  let len = len as usize;
  if incoming.len() < read + len {
    return Ok(None);
  }
  incoming.drain(0..read);
  Ok(Some(incoming.drain(0..len).collect()))
}

/// Builds the login success packet: the dashed uuid string, then the
/// username.
fn login_success(uuid: UUID, username: &str) -> Vec<u8> {
  let mut data = vec![];
  let mut out = Buffer::new(&mut data);
  out.write_varint(0x02);
  out.write_str(&uuid.as_dashed_str());
  out.write_str(username);
  data
}

impl Connection {
  fn new(stream: TcpStream, wake: Sender<WakeEvent>, waker: Arc<Waker>, tok: Token) -> Self {
    let (tx, rx) = crossbeam_channel::bounded(OUTBOUND_LIMIT);
    Connection {
      stream,
      state: State::Handshake,
      ver: 0,
      player: None,
      done: false,
      tx,
      rx,
      wake,
      waker,
      tok,
      incoming: Vec::with_capacity(1024),
      outgoing: Vec::with_capacity(1024),
      garbage: vec![0; 64 * 1024],
    }
  }

  /// Creates a sender that will queue packets for this connection.
  fn sender(&self) -> ConnSender {
    ConnSender {
      tx:    self.tx.clone(),
      wake:  self.wake.clone(),
      waker: self.waker.clone(),
      tok:   self.tok,
    }
  }

  /// Reads and handles everything currently available. `Ok(true)` means the
  /// peer closed the socket.
  fn read(&mut self, world: &Arc<World>) -> Result<bool, Error> {
    loop {
      let n = match self.stream.read(&mut self.garbage) {
        Ok(0) => return Ok(true),
        Ok(n) => n,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
        Err(e) => return Err(e.into()),
      };
      self.incoming.extend_from_slice(&self.garbage[..n]);
      while let Some(frame) = split_frame(&mut self.incoming)? {
        self.handle_frame(&frame, world)?;
      }
    }
  }

  fn handle_frame(&mut self, frame: &[u8], world: &Arc<World>) -> Result<(), Error> {
    let mut buf = Buffer::new(frame);
    let id = buf.read_varint()?;
    match self.state {
      State::Handshake => {
        if id != 0x00 {
          return Err(Error::UnexpectedPacket { id, state: self.state });
        }
        self.ver = buf.read_varint()?;
        let _addr = buf.read_str(255)?;
        let _port = buf.read_u16()?;
        match buf.read_varint()? {
          1 => self.state = State::Status,
          2 => self.state = State::Login,
          next => return Err(Error::BadNextState(next)),
        }
      }
      State::Status => match id {
        0x00 => {
          let mut data = vec![];
          let mut out = Buffer::new(&mut data);
          out.write_varint(0x00);
          out.write_str(&status::build(world));
          self.send_now(data);
        }
        0x01 => {
          let payload = buf.read_i64()?;
          let mut data = vec![];
          let mut out = Buffer::new(&mut data);
          out.write_varint(0x01);
          out.write_i64(payload);
          self.send_now(data);
          self.done = true;
        }
        _ => return Err(Error::UnexpectedPacket { id, state: self.state }),
      },
      State::Login => {
        if id != 0x00 {
          return Err(Error::UnexpectedPacket { id, state: self.state });
        }
        let username = buf.read_str(16)?;
        if self.ver != PROTOCOL_VERSION {
          info!("{} tried to join with protocol version {}", username, self.ver);
          let mut data = vec![];
          let mut out = Buffer::new(&mut data);
          out.write_varint(0x00);
          out.write_str(&Chat::new("Outdated client! Please use 1.8.x").to_json());
          self.send_now(data);
          self.done = true;
          return Ok(());
        }
        self.send_now(login_success(UUID::offline(&username), &username));
        self.state = State::Play;
        // The world will have told the client why if this fails, so we just
        // stay player-less and wait for the close event.
        self.player = world.new_player(self.sender(), username);
      }
      State::Play => {
        let payload = &frame[buf.index()..];
        let mut buf = Buffer::new(payload);
        match sb::Packet::from_buf(id, &mut buf)? {
          Some(p) => {
            if let Some(player) = &self.player {
              packet::handle(world, player, p);
            }
          }
          None => debug!("ignoring play packet {id:#04x}"),
        }
      }
    }
    Ok(())
  }

  /// Frames a finished packet straight into the outbound bytes. Used by the
  /// pre-play phases, which respond from the poll loop itself.
  fn send_now(&mut self, data: Vec<u8>) {
    self.outgoing.extend(util::serialize_varint(data.len() as i32));
    self.outgoing.extend(data);
  }

  /// Serializes everything queued on the channel into the outbound bytes,
  /// then flushes as much as the socket will take.
  fn try_send(&mut self) -> io::Result<()> {
    loop {
      match self.rx.try_recv() {
        Ok(p) => {
          let data = p.serialize();
          self.send_now(data);
        }
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => break,
      }
    }
    self.try_flush()
  }

  fn try_flush(&mut self) -> io::Result<()> {
    while !self.outgoing.is_empty() {
      let n = match self.stream.write(&self.outgoing) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
        Err(e) => return Err(e),
      };
      self.outgoing.drain(0..n);
    }
    Ok(())
  }
}

pub struct ConnectionManager {
  connections: HashMap<Token, Connection>,
  world:       Arc<World>,
}

impl ConnectionManager {
  pub fn new(world: Arc<World>) -> ConnectionManager {
    ConnectionManager { connections: HashMap::new(), world }
  }

  pub fn run(&mut self, addr: SocketAddr) -> io::Result<()> {
    const LISTEN: Token = Token(0xffffffff);
    const WAKE: Token = Token(0xfffffffe);

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(1024);
    let mut listen = TcpListener::bind(addr)?;

    let waker = Arc::new(Waker::new(poll.registry(), WAKE)?);
    poll.registry().register(&mut listen, LISTEN, Interest::READABLE)?;

    let (wake_tx, wake_rx) = crossbeam_channel::unbounded();
    self.world.set_net_handle(NetHandle { wake: wake_tx.clone(), waker: waker.clone() });

    let mut next_token = 0;

    loop {
      loop {
        match poll.poll(&mut events, None) {
          Ok(()) => break,
          Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
          Err(e) => return Err(e),
        }
      }

      for event in events.iter() {
        match event.token() {
          LISTEN => loop {
            let (mut conn, _addr) = match listen.accept() {
              Ok(v) => v,
              Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
              Err(e) => return Err(e),
            };
            let token = Token(next_token);
            next_token += 1;
            poll.registry().register(&mut conn, token, Interest::READABLE | Interest::WRITABLE)?;
            self
              .connections
              .insert(token, Connection::new(conn, wake_tx.clone(), waker.clone(), token));
          },
          WAKE => loop {
            match wake_rx.try_recv() {
              Ok(WakeEvent::Clientbound(tok)) => {
                let remove = match self.connections.get_mut(&tok) {
                  Some(conn) => conn.try_send().is_err(),
                  None => false,
                };
                if remove {
                  self.remove(tok);
                }
              }
              Ok(WakeEvent::Close(tok)) => {
                if let Some(conn) = self.connections.get_mut(&tok) {
                  let _ = conn.try_send();
                }
                self.remove(tok);
              }
              Ok(WakeEvent::Shutdown) => {
                info!("listener shutting down");
                for (_, conn) in self.connections.iter_mut() {
                  let _ = conn.try_send();
                }
                return Ok(());
              }
              Err(TryRecvError::Empty) => break,
              Err(TryRecvError::Disconnected) => break,
            }
          },
          token => {
            let mut remove = false;
            if let Some(conn) = self.connections.get_mut(&token) {
              if event.is_readable() {
                match conn.read(&self.world) {
                  Ok(false) => {}
                  Ok(true) => remove = true,
                  Err(e) => {
                    Self::log_error(&e, conn);
                    remove = true;
                  }
                }
              }
              if !remove && (event.is_writable() || !conn.outgoing.is_empty()) {
                // Reads above may have queued responses.
                if let Err(e) = conn.try_send() {
                  Self::log_error(&e.into(), conn);
                  remove = true;
                }
              }
              if !remove && conn.done && conn.outgoing.is_empty() {
                remove = true;
              }
            }
            if remove {
              self.remove(token);
            }
          }
        }
      }
    }
  }

  fn log_error(e: &Error, conn: &Connection) {
    if !matches!(e.io_kind(), Some(io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset)) {
      match &conn.player {
        Some(p) => error!("{}: connection error: {}", p.username(), e),
        None => error!("connection error: {}", e),
      }
    }
  }

  /// Drops the connection and, if a player was attached, removes them from
  /// the world.
  fn remove(&mut self, tok: Token) {
    if let Some(conn) = self.connections.remove(&tok) {
      match conn.player {
        Some(p) => self.world.remove_player(p.id()),
        None => {
          if conn.state == State::Play || conn.state == State::Login {
            info!("a client who has not finished logging in has left");
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn frames_split_across_reads() {
    // A 3 byte frame, arriving one byte at a time.
    let frame = [0x03, 0x01, 0x02, 0x03];
    let mut incoming = vec![];
    for (i, b) in frame.iter().enumerate() {
      incoming.push(*b);
      let got = split_frame(&mut incoming).unwrap();
      if i < frame.len() - 1 {
        assert_eq!(got, None);
      } else {
        assert_eq!(got, Some(vec![0x01, 0x02, 0x03]));
        assert!(incoming.is_empty());
      }
    }
  }

  #[test]
  fn two_frames_in_one_read() {
    let mut incoming = vec![0x01, 0xaa, 0x02, 0xbb, 0xcc];
    assert_eq!(split_frame(&mut incoming).unwrap(), Some(vec![0xaa]));
    assert_eq!(split_frame(&mut incoming).unwrap(), Some(vec![0xbb, 0xcc]));
    assert_eq!(split_frame(&mut incoming).unwrap(), None);
  }

  #[test]
  fn oversize_frame_errors() {
    // Length varint decodes to far more than the packet limit.
    let mut incoming = vec![0xff, 0xff, 0xff, 0x7f];
    assert!(split_frame(&mut incoming).is_err());
  }

  #[test]
  fn negative_length_errors() {
    let mut incoming = util::serialize_varint(-1);
    assert!(split_frame(&mut incoming).is_err());
  }

  #[test]
  fn login_success_layout() {
    let uuid = UUID::offline("Steve");
    let data = login_success(uuid, "Steve");
    let mut buf = Buffer::new(&data[..]);
    assert_eq!(buf.read_varint().unwrap(), 0x02);
    // The uuid goes out as a dashed string, which the client parses back.
    let uuid_str = buf.read_str(36).unwrap();
    assert_eq!(uuid_str, uuid.as_dashed_str());
    assert_eq!(uuid_str.len(), 36);
    assert_eq!(buf.read_str(16).unwrap(), "Steve");
    assert_eq!(buf.remaining(), 0);
  }
}
