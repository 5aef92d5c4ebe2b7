use crate::command::{Request, Response};
use crate::thread_pool::ThreadPool;
use crate::{KvsEngine, KvsError, Result};
use serde_json::Deserializer;
use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info};

/// A TCP socket server implementation over a key value storage engine.
/// It listens for incoming [`Request`]s on a [`SocketAddr`](https://doc.rust-lang.org/std/net/enum.SocketAddr.html),
/// deserializes the request, and then processes the request on a thread from its pool.
///
/// Each thread receives a handle to a [`KvsEngine`], and uses that engine to process the request.
///
/// # Example
/// Create and run a new server listening on "127.0.0.1:5555", with 4 threads running on a
/// shared queue thread pool, using an in-memory KvStore loaded from "db.json"
/// ```rust
/// use std::path::Path;
/// use snapkv::{KvStore, KvsServer};
/// use snapkv::thread_pool::{SharedQueueThreadPool, ThreadPool};
/// # fn main() -> snapkv::Result<()> {
/// let pool = SharedQueueThreadPool::new(4)?;
/// let engine = KvStore::open(Path::new("db.json"), true)?;
/// let server = KvsServer::new(engine, pool);
/// //server.run("127.0.0.1:5555")?;
/// # Ok(())
/// # }
/// ```
///
/// [`Request`]: ./enum.Request.html
pub struct KvsServer<E: KvsEngine, P: ThreadPool> {
    /// the kvs engine to use
    engine: E,
    /// a pool of threads that will perform work using a handle to the engine
    pool: P,
}

impl<E: KvsEngine, P: ThreadPool> KvsServer<E, P> {
    /// Create a new `KvsServer` using the given [`KvsEngine`] and [`ThreadPool`] implementation.
    pub fn new(engine: E, pool: P) -> Self {
        KvsServer { engine, pool }
    }

    /// starts a server listening on the given address.
    /// Each connection that comes in gets serviced on a thread from the ThreadPool
    ///
    /// # Errors
    /// returns [`KvsError`] if the server could not bind to `addr`
    ///
    /// [`KvsError`]: ./enum.KvsError.html
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.run_on(listener)
    }

    /// serves connections accepted on an already bound `listener`
    pub fn run_on(self, listener: TcpListener) -> Result<()> {
        info!("listening on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let eng = self.engine.clone();
                    self.pool.spawn(move || {
                        if let Err(e) = serve(eng, stream) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }
        Ok(())
    }
}

/// Listens for and processes kvs [`Request`]s coming over the given `tcp` stream
/// This function will: deserialize the request, execute the request in the KvsEngine,
/// and finally return a [`Response`] to the client on the `tcp` stream
///
/// [`Request`]: ./enum.Request.html
/// [`Response`]: ./enum.Response.html
fn serve<E: KvsEngine>(engine: E, tcp: TcpStream) -> Result<()> {
    let peer_addr = tcp.peer_addr()?;
    let stream_reader = BufReader::new(&tcp);
    let mut stream_writer = BufWriter::new(&tcp);
    let req_reader = Deserializer::from_reader(stream_reader).into_iter::<Request>();

    let mut send_resp = move |resp: Response| -> Result<()> {
        serde_json::to_writer(&mut stream_writer, &resp)?;
        stream_writer.flush()?;
        debug!("Response sent to {}: {:?}", peer_addr, resp);
        Ok(())
    };

    for req in req_reader {
        let req = req?;
        debug!("Receive request from {}: {:?}", peer_addr, req);

        let resp = match req {
            Request::Get { key } => value_response(engine.get(&key), key),
            Request::List => Response::Items(engine.list()),
            Request::Delete { key } => value_response(engine.delete(&key), key),
            Request::Upsert { items } => {
                engine.upsert(items.clone());
                Response::Items(items)
            }
        };
        send_resp(resp)?;
    }
    Ok(())
}

/// maps the result of a single key operation to its [`Response`], keeping a missing key
/// distinct from every other failure
fn value_response(result: Result<String>, key: String) -> Response {
    match result {
        Ok(value) => Response::Ok(value),
        Err(KvsError::KeyNotFound) => Response::NotFound(key),
        Err(e) => Response::Err(format!("{}", e)),
    }
}
