use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use serde::Deserialize;
use serde_json::de::IoRead;
use serde_json::Deserializer;
use crate::command::{Request, Response};
use crate::engine::StoreState;
use crate::{KvsError, Result};

/// `KvsClient` contains the functionality for communication with a [`KvsServer`]
pub struct KvsClient {
    reader: Deserializer<IoRead<BufReader<TcpStream>>>,
    writer: BufWriter<TcpStream>,
}

impl KvsClient {

    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(KvsClient {
            reader: Deserializer::from_reader(BufReader::new(tcp_reader)),
            writer: BufWriter::new(tcp_writer),
        })
    }

    /// gets the value of the specified `key` from the server
    /// # Errors
    /// `Err<KvsError::KeyNotFound>` if there is no value associated with the key
    /// `Err<KvsError::StringErr>` if the server failed to process the request
    pub fn get(&mut self, key: String) -> Result<String> {
        match self.send(&Request::Get { key })? {
            Response::Ok(value) => Ok(value),
            resp => Err(unexpected(resp)),
        }
    }

    /// fetches every key/value pair held by the server
    pub fn list(&mut self) -> Result<StoreState> {
        match self.send(&Request::List)? {
            Response::Items(items) => Ok(items),
            resp => Err(unexpected(resp)),
        }
    }

    /// removes a key and its associated value from the store
    /// # Returns
    /// the value that was removed
    /// # Errors
    /// `Err<KvsError::KeyNotFound>` if the key was not in the store
    pub fn delete(&mut self, key: String) -> Result<String> {
        match self.send(&Request::Delete { key })? {
            Response::Ok(value) => Ok(value),
            resp => Err(unexpected(resp)),
        }
    }

    /// sends a batch of key/values to be inserted or overwritten in the store
    /// # Returns
    /// the items that were applied by the server
    pub fn upsert(&mut self, items: StoreState) -> Result<StoreState> {
        match self.send(&Request::Upsert { items })? {
            Response::Items(applied) => Ok(applied),
            resp => Err(unexpected(resp)),
        }
    }

    /// writes `req` to the server and waits for its response
    fn send(&mut self, req: &Request) -> Result<Response> {
        serde_json::to_writer(&mut self.writer, req)?;
        self.writer.flush()?;
        Ok(Response::deserialize(&mut self.reader)?)
    }
}

/// converts a response that does not carry the expected payload into an error
fn unexpected(resp: Response) -> KvsError {
    match resp {
        Response::NotFound(_) => KvsError::KeyNotFound,
        Response::Err(msg) => KvsError::StringErr(msg), // re-throwing error here
        other => KvsError::StringErr(format!("unexpected response from server: {:?}", other)),
    }
}
