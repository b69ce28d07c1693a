//! Tello client
//!
//! Owns the two endpoints, the background listeners and the command path, and
//! exposes the SDK vocabulary on top of them.

use crate::command::{CommandDispatcher, ControlSender};
use crate::config::TelloConfig;
use crate::connection::{
    spawn_ack_listener, spawn_state_listener, ListenerHandle, ListenerStatus, ResponseSlot,
    Telemetry, TelloEvent,
};
use crate::transport::{DatagramEndpoint, EndpointBinder, UdpBinder};
use crate::video::{Frame, FrameSource, UdpPassthroughDecoder, VideoDecoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tello_shared::{Direction, Listener, ReadCommand, Rotation, TelloCommand, TelloError};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

/// Client for a single drone
pub struct Tello {
    config: TelloConfig,
    dispatcher: Arc<CommandDispatcher>,
    control: ControlSender,
    ack_listener: ListenerHandle,
    state_listener: ListenerHandle,
    telemetry: watch::Receiver<Option<Telemetry>>,
    events: broadcast::Sender<TelloEvent>,
    command_addr: SocketAddr,
    state_addr: SocketAddr,
    decoder: Box<dyn VideoDecoder>,
    video: Option<Box<dyn FrameSource>>,
    stream_on: bool,
}

impl Tello {
    /// Bind the command and state ports over UDP and start the listeners
    pub async fn new(config: TelloConfig) -> Result<Self, TelloError> {
        Self::with_binder(config, &UdpBinder::new()).await
    }

    /// Bind both endpoints through the given transport
    pub async fn with_binder(
        config: TelloConfig,
        binder: &dyn EndpointBinder,
    ) -> Result<Self, TelloError> {
        let command = binder.bind(config.command_port).await?;
        let state = binder.bind(config.state_port).await?;
        info!(
            "[CMD] {} endpoints bound: command={} state={}",
            binder.name(),
            command.local_addr()?,
            state.local_addr()?
        );
        Self::with_endpoints(config, command, state)
    }

    /// Build over already-bound endpoints. Must run inside a tokio runtime.
    pub fn with_endpoints(
        config: TelloConfig,
        command: Arc<dyn DatagramEndpoint>,
        state: Arc<dyn DatagramEndpoint>,
    ) -> Result<Self, TelloError> {
        let command_addr = command.local_addr()?;
        let state_addr = state.local_addr()?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let slot = Arc::new(ResponseSlot::new());
        let (telemetry_tx, telemetry) = watch::channel(None);

        let ack_listener = spawn_ack_listener(
            command.clone(),
            config.response_buffer_size,
            slot.clone(),
            events.clone(),
        );
        let state_listener = spawn_state_listener(
            state,
            config.state_buffer_size,
            telemetry_tx,
            events.clone(),
        );

        let dispatcher = Arc::new(CommandDispatcher::new(
            command,
            config.peer,
            slot,
            ack_listener.subscribe(),
            events.clone(),
            config.command_spacing,
            config.response_timeout,
        ));
        let control = ControlSender::new(dispatcher.clone(), config.retry_count, events.clone());

        Ok(Self {
            config,
            dispatcher,
            control,
            ack_listener,
            state_listener,
            telemetry,
            events,
            command_addr,
            state_addr,
            decoder: Box::new(UdpPassthroughDecoder),
            video: None,
            stream_on: false,
        })
    }

    /// Replace the decoder used by `start_video`
    pub fn with_video_decoder(mut self, decoder: impl VideoDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &TelloConfig {
        &self.config
    }

    /// Local address replies are received on
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// Local address telemetry is received on
    pub fn state_addr(&self) -> SocketAddr {
        self.state_addr
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TelloEvent> {
        self.events.subscribe()
    }

    pub fn listener_status(&self, listener: Listener) -> ListenerStatus {
        match listener {
            Listener::Ack => self.ack_listener.status(),
            Listener::State => self.state_listener.status(),
        }
    }

    /// Latest telemetry, if any has arrived. Never blocks.
    pub fn state(&self) -> Option<Telemetry> {
        self.telemetry.borrow().clone()
    }

    /// Latest telemetry as text
    pub fn state_text(&self) -> Option<String> {
        self.telemetry.borrow().as_ref().map(Telemetry::text)
    }

    /// Watch telemetry snapshots as they arrive
    pub fn subscribe_state(&self) -> watch::Receiver<Option<Telemetry>> {
        self.telemetry.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_on
    }

    /// Address handed to the video decoder
    pub fn video_address(&self) -> String {
        self.config.video_url()
    }

    /// Send a command and return the drone's reply text
    pub async fn send_command(&self, command: &str) -> Result<String, TelloError> {
        self.dispatcher.send_command(command).await
    }

    /// Send a command the drone does not answer
    pub async fn send_command_noreturn(&self, command: &str) -> Result<(), TelloError> {
        self.dispatcher.send_command_noreturn(command).await
    }

    /// Send a control command with retries.
    ///
    /// Returns `Ok(true)` on success. When every attempt fails this is
    /// `Err(CommandFailed)` if exceptions are enabled, otherwise `Ok(false)`.
    pub async fn send_control_command(&self, command: &str) -> Result<bool, TelloError> {
        match self.control.send_control_command(command).await {
            Ok(()) => Ok(true),
            // Already logged by the control layer
            Err(TelloError::CommandFailed { .. }) if !self.config.enable_exceptions => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn control(&self, command: TelloCommand) -> Result<bool, TelloError> {
        self.send_control_command(&command.to_wire()).await
    }

    /// Enter SDK mode
    pub async fn connect(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::Command).await
    }

    pub async fn takeoff(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::Takeoff).await
    }

    pub async fn land(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::Land).await
    }

    /// Stop all motors immediately
    pub async fn emergency(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::Emergency).await
    }

    pub async fn streamon(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::StreamOn).await
    }

    pub async fn streamoff(&self) -> Result<bool, TelloError> {
        self.control(TelloCommand::StreamOff).await
    }

    /// Fly `distance` cm in `direction`; distance is clamped to 20..=500
    pub async fn move_by(&self, direction: Direction, distance: i32) -> Result<bool, TelloError> {
        self.control(TelloCommand::Move {
            direction,
            distance,
        })
        .await
    }

    pub async fn up(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Up, distance).await
    }

    pub async fn down(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Down, distance).await
    }

    pub async fn left(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Left, distance).await
    }

    pub async fn right(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Right, distance).await
    }

    pub async fn forward(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Forward, distance).await
    }

    pub async fn back(&self, distance: i32) -> Result<bool, TelloError> {
        self.move_by(Direction::Back, distance).await
    }

    /// Rotate `angle` degrees; angle is clamped to 1..=3600
    pub async fn rotate(&self, rotation: Rotation, angle: i32) -> Result<bool, TelloError> {
        self.control(TelloCommand::Rotate { rotation, angle }).await
    }

    pub async fn rotate_clockwise(&self, angle: i32) -> Result<bool, TelloError> {
        self.rotate(Rotation::Clockwise, angle).await
    }

    pub async fn rotate_counter_clockwise(&self, angle: i32) -> Result<bool, TelloError> {
        self.rotate(Rotation::CounterClockwise, angle).await
    }

    /// Set speed in cm/s; clamped to 10..=100
    pub async fn set_speed(&self, speed: i32) -> Result<bool, TelloError> {
        self.control(TelloCommand::Speed(speed)).await
    }

    /// Send remote-control channel values (each clamped to -100..=100). No reply.
    pub async fn send_rc_control(
        &self,
        left_right: i32,
        forward_back: i32,
        up_down: i32,
        yaw: i32,
    ) -> Result<(), TelloError> {
        let command = TelloCommand::Rc {
            left_right,
            forward_back,
            up_down,
            yaw,
        };
        self.send_command_noreturn(&command.to_wire()).await
    }

    /// Ask the drone for a value. Read commands are not retried.
    pub async fn query(&self, query: ReadCommand) -> Result<String, TelloError> {
        self.send_command(query.as_str()).await
    }

    /// Battery percentage
    pub async fn query_battery(&self) -> Result<u8, TelloError> {
        let response = self.query(ReadCommand::Battery).await?;
        response
            .trim()
            .parse()
            .map_err(|_| TelloError::UnexpectedResponse {
                command: ReadCommand::Battery.as_str().into(),
                response,
            })
    }

    /// Switch the stream on and open a frame source on the video address
    pub async fn start_video(&mut self) -> Result<bool, TelloError> {
        if !self.streamon().await? {
            return Ok(false);
        }
        self.stream_on = true;

        let address = self.video_address();
        if self.video.is_none() {
            let source = self
                .decoder
                .open(&address)
                .await
                .map_err(|e| TelloError::Video(format!("{:#}", e)))?;
            self.video = Some(source);
        }

        info!("[VIDEO] Streaming from {}", address);
        let _ = self.events.send(TelloEvent::StreamStarted { address });
        Ok(true)
    }

    /// Switch the stream off and release the frame source
    pub async fn stop_video(&mut self) -> Result<bool, TelloError> {
        let result = self.streamoff().await;
        self.stream_on = false;

        if let Some(mut source) = self.video.take() {
            if let Err(e) = source.release().await {
                warn!("[VIDEO] Failed to release stream source: {:#}", e);
            }
            let _ = self.events.send(TelloEvent::StreamStopped);
        }

        result
    }

    /// Next frame from the open source
    pub async fn video_frame(&mut self) -> Result<Option<Frame>, TelloError> {
        match self.video.as_mut() {
            Some(source) => source
                .read_frame()
                .await
                .map_err(|e| TelloError::Video(format!("{:#}", e))),
            None => Err(TelloError::Video("video stream not started".into())),
        }
    }

    /// Stop video if it is running and shut down both listeners
    pub async fn end(&mut self) -> Result<(), TelloError> {
        let result = if self.stream_on || self.video.is_some() {
            self.stop_video().await.map(|_| ())
        } else {
            Ok(())
        };

        self.ack_listener.shutdown();
        self.state_listener.shutdown();
        info!("[CMD] Client shut down");

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{addr, pair, MemoryPeer};
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_config(enable_exceptions: bool) -> TelloConfig {
        TelloConfig {
            peer: addr(18889),
            enable_exceptions,
            ..Default::default()
        }
    }

    fn client(config: TelloConfig) -> (Tello, MemoryPeer, MemoryPeer) {
        let (command, command_peer) = pair(addr(8889), config.peer);
        let (state, state_peer) = pair(addr(8890), config.peer);
        let tello = Tello::with_endpoints(config, command, state).unwrap();
        (tello, command_peer, state_peer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_takeoff_ok_first_attempt() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, seen) = peer.respond_with(|_| Some("ok".into()));

        assert!(tello.takeoff().await.unwrap());
        assert_eq!(*seen.lock().unwrap(), vec!["takeoff".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_takeoff_silent_peer_raises() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, seen) = peer.respond_with(|_| None);

        let err = tello.takeoff().await.unwrap_err();
        assert!(matches!(err, TelloError::CommandFailed { attempts: 3, .. }));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_takeoff_silent_peer_returns_false() {
        let (tello, peer, _state) = client(test_config(false));
        let (_task, seen) = peer.respond_with(|_| None);

        assert!(!tello.takeoff().await.unwrap());
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vocabulary_is_clamped() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, seen) = peer.respond_with(|_| Some("ok".into()));

        tello.move_by(Direction::Left, 5).await.unwrap();
        tello.up(9000).await.unwrap();
        tello.rotate(Rotation::Clockwise, 0).await.unwrap();
        tello.rotate_counter_clockwise(5000).await.unwrap();
        tello.set_speed(5).await.unwrap();
        tello.set_speed(150).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "left 20", "up 500", "cw 1", "ccw 3600", "speed 10", "speed 100"
            ]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_argument_controls() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, seen) = peer.respond_with(|_| Some("ok".into()));

        assert!(tello.connect().await.unwrap());
        assert!(tello.land().await.unwrap());
        assert!(tello.emergency().await.unwrap());

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["command".to_string(), "land".into(), "emergency".into()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_reads_during_command() {
        let (tello, peer, state) = client(test_config(false));
        let (_task, _seen) = peer.respond_with(|_| None);
        let tello = Arc::new(tello);

        assert!(tello.state().is_none());

        let flying = tello.clone();
        let takeoff = tokio::spawn(async move { flying.takeoff().await });

        let mut updates = tello.subscribe_state();
        for battery in [90, 89, 88] {
            state.deliver(format!("bat:{};\r\n", battery).as_bytes());
            updates.changed().await.unwrap();
            assert_eq!(tello.state_text(), Some(format!("bat:{};", battery)));
        }

        assert!(!takeoff.await.unwrap().unwrap());
        assert_eq!(tello.state_text().as_deref(), Some("bat:88;"));
    }

    #[tokio::test]
    async fn test_full_state_line_kept_whole() {
        let (tello, _peer, state) = client(test_config(true));
        let line = "mid:-1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;\
                    templ:63;temph:65;tof:10;h:0;bat:87;baro:182.06;time:12;agx:-2.00;\
                    agy:1.00;agz:-998.00;\r\n";
        assert!(line.len() > 128);

        let mut updates = tello.subscribe_state();
        state.deliver(line.as_bytes());
        updates.changed().await.unwrap();

        let snapshot = tello.state().unwrap();
        assert_eq!(snapshot.payload.len(), line.len());
        assert_eq!(tello.state_text().as_deref(), Some(line.trim_end()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_battery() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, _seen) = peer.respond_with(|cmd| match cmd {
            "battery?" => Some("87\r\n".into()),
            _ => Some("ok".into()),
        });

        assert_eq!(tello.query_battery().await.unwrap(), 87);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_battery_rejects_garbage() {
        let (tello, peer, _state) = client(test_config(true));
        let (_task, _seen) = peer.respond_with(|_| Some("error".into()));

        assert!(matches!(
            tello.query_battery().await,
            Err(TelloError::UnexpectedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_rc_control_is_fire_and_forget() {
        let (tello, mut peer, _state) = client(test_config(true));

        tello.send_rc_control(0, 150, -20, -300).await.unwrap();
        assert_eq!(peer.try_next_sent().as_deref(), Some("rc 0 100 -20 -100"));
    }

    #[tokio::test]
    async fn test_ack_listener_failure_is_observable() {
        let (tello, peer, _state) = client(test_config(true));
        let mut events = tello.subscribe_events();

        drop(peer);

        loop {
            if let TelloEvent::ListenerStopped { listener, .. } = events.recv().await.unwrap() {
                assert_eq!(listener, Listener::Ack);
                break;
            }
        }
        assert!(matches!(
            tello.listener_status(Listener::Ack),
            ListenerStatus::Stopped { .. }
        ));
        assert_eq!(tello.listener_status(Listener::State), ListenerStatus::Running);

        let err = tello.takeoff().await.unwrap_err();
        assert!(matches!(err, TelloError::CommandFailed { attempts: 0, .. }));
    }

    struct FakeSource {
        released: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl FrameSource for FakeSource {
        async fn read_frame(&mut self) -> AnyResult<Option<Frame>> {
            Ok(Some(Frame {
                data: bytes::Bytes::from_static(&[0, 0, 0, 1]),
                received_at: tokio::time::Instant::now(),
            }))
        }

        async fn release(&mut self) -> AnyResult<()> {
            *self.released.lock().unwrap() = true;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeDecoder {
        opened: Arc<Mutex<Vec<String>>>,
        released: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl VideoDecoder for FakeDecoder {
        async fn open(&self, address: &str) -> AnyResult<Box<dyn FrameSource>> {
            self.opened.lock().unwrap().push(address.to_string());
            Ok(Box::new(FakeSource {
                released: self.released.clone(),
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_start_and_end() {
        let (tello, peer, _state) = client(test_config(true));
        let decoder = FakeDecoder::default();
        let mut tello = tello.with_video_decoder(decoder.clone());
        let (_task, seen) = peer.respond_with(|_| Some("ok".into()));

        assert!(matches!(tello.video_frame().await, Err(TelloError::Video(_))));

        assert!(tello.start_video().await.unwrap());
        assert!(tello.is_streaming());
        assert_eq!(
            *decoder.opened.lock().unwrap(),
            vec!["udp://@0.0.0.0:11111".to_string()]
        );

        let frame = tello.video_frame().await.unwrap().unwrap();
        assert_eq!(&frame.data[..], &[0, 0, 0, 1]);

        tello.end().await.unwrap();
        assert!(!tello.is_streaming());
        assert!(*decoder.released.lock().unwrap());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["streamon".to_string(), "streamoff".into()]
        );
        assert!(matches!(
            tello.listener_status(Listener::Ack),
            ListenerStatus::Stopped { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_not_opened_when_streamon_fails() {
        let (tello, peer, _state) = client(test_config(false));
        let decoder = FakeDecoder::default();
        let mut tello = tello.with_video_decoder(decoder.clone());
        let (_task, _seen) = peer.respond_with(|_| Some("error".into()));

        assert!(!tello.start_video().await.unwrap());
        assert!(!tello.is_streaming());
        assert!(decoder.opened.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounded_by_response_time() {
        let config = TelloConfig {
            response_timeout: Duration::from_secs(2),
            ..test_config(true)
        };
        let (tello, peer, _state) = client(config);
        let (_task, _seen) = peer.respond_with(|_| None);

        let start = tokio::time::Instant::now();
        let err = tello.send_command("sdk?").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(3));
    }
}
