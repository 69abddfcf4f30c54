use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{Order, Product, ProductId, StockMovement};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    Result,
    store::{MovementLog, OrderStore, ProductStore},
};

const PRODUCTS_FILE: &str = "products.json";
const ORDERS_FILE: &str = "orders.json";
const MOVEMENTS_FILE: &str = "movements.jsonl";

/// JSON file store.
///
/// Products and orders are kept as whole JSON documents that are rewritten
/// through a temporary file and an atomic rename. Movements are appended as
/// JSON lines and never rewritten.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self {
            dir,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_document<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_document<T: Serialize>(&self, name: &str, records: &[T]) -> Result<()> {
        let path = self.path(name);
        let tmp = self.path(&format!("{name}.tmp"));

        let json = serde_json::to_vec_pretty(records)?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Loads, edits, and rewrites one document under the write lock.
    fn modify_document<T, F>(&self, name: &str, edit: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>),
    {
        let _guard = self.write_lock.lock();
        let mut records = self.read_document::<T>(name)?;
        edit(&mut records);
        self.write_document(name, &records)
    }

    /// Cuts a torn trailing line off the movement log so the next append
    /// starts on a line of its own. Callers hold the write lock.
    fn truncate_torn_tail(&self) -> Result<()> {
        let path = self.path(MOVEMENTS_FILE);
        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(());
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        if last[0] == b'\n' {
            return Ok(());
        }

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;
        let keep = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |pos| pos + 1);
        warn!(
            path = %path.display(),
            dropped_bytes = bytes.len() - keep,
            "Truncating incomplete trailing movement line"
        );
        file.set_len(keep as u64)?;
        file.sync_data()?;
        Ok(())
    }
}

impl ProductStore for FileStore {
    fn save_product(&self, product: &Product) -> Result<()> {
        self.modify_document::<Product, _>(PRODUCTS_FILE, |products| {
            match products.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => *existing = product.clone(),
                None => products.push(product.clone()),
            }
        })
    }

    fn delete_product(&self, id: &ProductId) -> Result<()> {
        self.modify_document::<Product, _>(PRODUCTS_FILE, |products| {
            products.retain(|p| &p.id != id);
        })
    }

    fn load_products(&self) -> Result<Vec<Product>> {
        self.read_document(PRODUCTS_FILE)
    }
}

impl OrderStore for FileStore {
    fn save_order(&self, order: &Order) -> Result<()> {
        self.modify_document::<Order, _>(ORDERS_FILE, |orders| {
            match orders.iter_mut().find(|o| o.id == order.id) {
                Some(existing) => *existing = order.clone(),
                None => orders.push(order.clone()),
            }
        })
    }

    fn load_orders(&self) -> Result<Vec<Order>> {
        self.read_document(ORDERS_FILE)
    }
}

impl MovementLog for FileStore {
    fn append_movement(&self, movement: &StockMovement) -> Result<()> {
        let mut line = serde_json::to_vec(movement)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock();
        self.truncate_torn_tail()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(MOVEMENTS_FILE))?;
        file.write_all(&line)?;
        file.sync_data()?;
        Ok(())
    }

    fn load_movements(&self) -> Result<Vec<StockMovement>> {
        let path = self.path(MOVEMENTS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = BufReader::new(File::open(&path)?);
        let mut movements = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            // A line without its newline is a torn write from a crash
            if !line.ends_with('\n') {
                warn!(path = %path.display(), "Ignoring incomplete trailing movement line");
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            movements.push(serde_json::from_str(trimmed)?);
        }
        Ok(movements)
    }
}
