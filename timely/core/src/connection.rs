use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;
use timely_proto::prelude::{Command, Ele, Format, Opcode, Reply};

use crate::config::ConnectionConfig;
use crate::decode::{self, Info, Members};
use crate::error::{Result, TimelyError};
use crate::transport::{TcpTransport, Transport};

/// A shared handle to the store.
///
/// Owns one [`Transport`] and runs at most one command on it at a time. Each
/// method holds the lock for exactly one command; use [`Connection::synchronize`]
/// to keep the lock across several.
///
/// # Usage Example
///
/// ```no_run
/// use timely_core::config::ConnectionConfig;
/// use timely_core::connection::Connection;
///
/// let conn = Connection::open(&ConnectionConfig::default());
/// conn.set("s", 5, [("value", "7")])?;
/// assert_eq!(conn.exists("s")?, Some(true));
/// # Ok::<(), timely_core::error::TimelyError>(())
/// ```
pub struct Connection {
    transport: Mutex<Box<dyn Transport>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Mutex::new(Box::new(transport)),
        }
    }

    /// Connection over TCP; the stream is opened by the first command.
    pub fn open(config: &ConnectionConfig) -> Self {
        Self::new(TcpTransport::new(config.clone()))
    }

    /// Run `f` with exclusive use of the transport.
    pub fn synchronize<R>(&self, f: impl FnOnce(&mut Session<'_>) -> R) -> R {
        let mut guard = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut session = Session {
            transport: &mut **guard,
        };
        f(&mut session)
    }

    /// Run `f` with the transport's reconnect policy set to `enabled`,
    /// restoring the previous policy afterwards, even if `f` panics.
    pub fn with_reconnect<R>(&self, enabled: bool, f: impl FnOnce(&mut Session<'_>) -> R) -> R {
        self.synchronize(|session| {
            let previous = session.set_reconnect(enabled);
            let mut restore = RestoreReconnect { session, previous };
            f(&mut *restore)
        })
    }

    pub fn without_reconnect<R>(&self, f: impl FnOnce(&mut Session<'_>) -> R) -> R {
        self.with_reconnect(false, f)
    }

    pub fn ping(&self) -> Result<Reply> {
        self.synchronize(|s| s.ping())
    }

    pub fn info(&self) -> Result<Info> {
        self.synchronize(|s| s.info())
    }

    pub fn exists(&self, series: &str) -> Result<Option<bool>> {
        self.synchronize(|s| s.exists(series))
    }

    pub fn dimensions(&self, series: &str, time: i64) -> Result<Vec<String>> {
        self.synchronize(|s| s.dimensions(series, time))
    }

    pub fn members<I, S>(&self, series: &str, format: Format, dimensions: I) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.synchronize(|s| s.members(series, format, dimensions))
    }

    pub fn range<I, S>(
        &self,
        series: &str,
        format: Format,
        from: i64,
        to: i64,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.synchronize(|s| s.range(series, format, from, to, dimensions))
    }

    pub fn members_with_time<I, S>(
        &self,
        series: &str,
        format: Format,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.synchronize(|s| s.members_with_time(series, format, dimensions))
    }

    pub fn range_with_time<I, S>(
        &self,
        series: &str,
        format: Format,
        from: i64,
        to: i64,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.synchronize(|s| s.range_with_time(series, format, from, to, dimensions))
    }

    pub fn get<I, S>(&self, series: &str, time: i64, dimensions: I) -> Result<Vec<Ele>>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.synchronize(|s| s.get(series, time, dimensions))
    }

    pub fn set<I, K, V>(&self, series: &str, time: i64, fields: I) -> Result<Option<bool>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Ele>,
        V: Into<Ele>,
    {
        self.synchronize(|s| s.set(series, time, fields))
    }

    pub fn delete_series(&self, series: &str) -> Result<Option<bool>> {
        self.synchronize(|s| s.delete_series(series))
    }

    pub fn delete_member(&self, series: &str, time: i64) -> Result<Option<bool>> {
        self.synchronize(|s| s.delete_member(series, time))
    }
}

/// Exclusive access to a connection's transport for one unit of work.
pub struct Session<'a> {
    transport: &'a mut dyn Transport,
}

impl Session<'_> {
    /// Send one command and return the undecoded reply.
    pub fn call(&mut self, command: Command) -> Result<Reply> {
        log::debug!(
            "{} ({} args)",
            command.opcode(),
            command.arguments().len()
        );
        Ok(self.transport.call(&command)?)
    }

    pub fn set_reconnect(&mut self, enabled: bool) -> bool {
        self.transport.set_reconnect(enabled)
    }

    /// Returns `PONG` from a live store.
    pub fn ping(&mut self) -> Result<Reply> {
        self.call(Command::new(Opcode::Ping))
    }

    pub fn info(&mut self) -> Result<Info> {
        self.call(Command::new(Opcode::Info)).map(decode::hashify)
    }

    pub fn exists(&mut self, series: &str) -> Result<Option<bool>> {
        let reply = self.call(Command::new(Opcode::Exists).arg(series))?;
        Ok(decode::boolify(&reply))
    }

    /// Dimensions stored on one sample, in the order the store keeps them.
    pub fn dimensions(&mut self, series: &str, time: i64) -> Result<Vec<String>> {
        self.call(Command::new(Opcode::Dimensions).arg(series).arg(time))
            .map(decode::names)
    }

    /// Selected dimensions of every sample in the series, chunked by the
    /// number of requested dimensions.
    pub fn members<I, S>(&mut self, series: &str, format: Format, dimensions: I) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        let dimensions = requested(dimensions)?;
        let arity = dimensions.len();
        let command = Command::new(Opcode::Members).arg(series).arg(format);
        self.select(command.args(dimensions), arity, format)
    }

    /// Selected dimensions of the samples with `from <= time < to`.
    pub fn range<I, S>(
        &mut self,
        series: &str,
        format: Format,
        from: i64,
        to: i64,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        let dimensions = requested(dimensions)?;
        let arity = dimensions.len();
        let command = range_command(series, format, from, to);
        self.select(command.args(dimensions), arity, format)
    }

    /// Like [`Session::members`], for a store that leads every record with
    /// its sample time. `time` is never sent; each tuple is one field wider
    /// than `dimensions`.
    pub fn members_with_time<I, S>(
        &mut self,
        series: &str,
        format: Format,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        let dimensions: Vec<Ele> = dimensions.into_iter().map(Into::into).collect();
        let arity = dimensions.len() + 1;
        let command = Command::new(Opcode::Members).arg(series).arg(format);
        self.select(command.args(dimensions), arity, format)
    }

    /// Like [`Session::range`], with the sample time leading every record.
    pub fn range_with_time<I, S>(
        &mut self,
        series: &str,
        format: Format,
        from: i64,
        to: i64,
        dimensions: I,
    ) -> Result<Members>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        let dimensions: Vec<Ele> = dimensions.into_iter().map(Into::into).collect();
        let arity = dimensions.len() + 1;
        let command = range_command(series, format, from, to);
        self.select(command.args(dimensions), arity, format)
    }

    fn select(&mut self, command: Command, arity: usize, format: Format) -> Result<Members> {
        let reply = self.call(command)?;
        decode::partition(reply, arity, format)
    }

    /// Values of the requested dimensions, aligned with `dimensions`.
    pub fn get<I, S>(&mut self, series: &str, time: i64, dimensions: I) -> Result<Vec<Ele>>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.call(get_command(series, time, dimensions))
            .map(decode::values)
    }

    /// Like [`Session::get`], but `None` unless the store answers with a sequence.
    pub fn sample<I, S>(
        &mut self,
        series: &str,
        time: i64,
        dimensions: I,
    ) -> Result<Option<Vec<Ele>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<Ele>,
    {
        self.call(get_command(series, time, dimensions))
            .map(decode::sample)
    }

    /// Write dimensions of one sample, creating the series if needed.
    pub fn set<I, K, V>(&mut self, series: &str, time: i64, fields: I) -> Result<Option<bool>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Ele>,
        V: Into<Ele>,
    {
        let tokens = fields.into_iter().flat_map(|(field, value)| {
            let field: Ele = field.into();
            [field, value.into()]
        });
        let reply = self.call(Command::new(Opcode::Set).arg(series).arg(time).args(tokens))?;
        Ok(decode::boolify(&reply))
    }

    pub fn delete_series(&mut self, series: &str) -> Result<Option<bool>> {
        let reply = self.call(Command::new(Opcode::DelSeries).arg(series))?;
        Ok(decode::boolify(&reply))
    }

    pub fn delete_member(&mut self, series: &str, time: i64) -> Result<Option<bool>> {
        let reply = self.call(Command::new(Opcode::DelSeries).arg(series).arg(time))?;
        Ok(decode::boolify(&reply))
    }
}

/// Puts the reconnect policy back when dropped, so a panicking closure
/// cannot leave it changed.
struct RestoreReconnect<'s, 'a> {
    session: &'s mut Session<'a>,
    previous: bool,
}

impl<'a> Deref for RestoreReconnect<'_, 'a> {
    type Target = Session<'a>;

    fn deref(&self) -> &Session<'a> {
        self.session
    }
}

impl<'a> DerefMut for RestoreReconnect<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Session<'a> {
        self.session
    }
}

impl Drop for RestoreReconnect<'_, '_> {
    fn drop(&mut self) {
        self.session.set_reconnect(self.previous);
    }
}

fn range_command(series: &str, format: Format, from: i64, to: i64) -> Command {
    Command::new(Opcode::Range)
        .arg(series)
        .arg(format)
        .arg(from)
        .arg(to)
}

fn get_command<I, S>(series: &str, time: i64, dimensions: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: Into<Ele>,
{
    Command::new(Opcode::Get)
        .arg(series)
        .arg(time)
        .args(dimensions)
}

// Multi-record replies are chunked by the number of requested dimensions.
fn requested<I, S>(dimensions: I) -> Result<Vec<Ele>>
where
    I: IntoIterator<Item = S>,
    S: Into<Ele>,
{
    let dimensions: Vec<Ele> = dimensions.into_iter().map(Into::into).collect();
    if dimensions.is_empty() {
        return Err(TimelyError::InvalidArgument(
            "at least one dimension must be requested".to_string(),
        ));
    }
    Ok(dimensions)
}

/// Process-wide default connection.
static CURRENT: Lazy<RwLock<Option<Arc<Connection>>>> = Lazy::new(|| RwLock::new(None));

/// The default connection, opened from the environment on first use.
pub fn current() -> Result<Arc<Connection>> {
    if let Some(conn) = CURRENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return Ok(conn.clone());
    }

    let mut slot = CURRENT.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(conn) = slot.as_ref() {
        return Ok(conn.clone());
    }
    let config = ConnectionConfig::from_env()?;
    log::info!("opening default connection to {}", config.address());
    let conn = Arc::new(Connection::open(&config));
    *slot = Some(conn.clone());
    Ok(conn)
}

/// Replace the default connection, returning the previous one.
pub fn set_current(connection: Arc<Connection>) -> Option<Arc<Connection>> {
    CURRENT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(connection)
}

/// Forget the default connection; the next [`current`] opens a new one.
pub fn reset_current() -> Option<Arc<Connection>> {
    CURRENT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}
