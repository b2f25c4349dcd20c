use std::io;
use std::str::FromStr;

pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        item.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        item.as_integer()
            .and_then(|i| if i >= 0 { Some(i as usize) } else { None })
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        let mut item = &self.value;
        for key in k.as_ref().split('.') {
            item = item.get(key)?;
        }
        item.as_bool()
    }

    /// Set an entry by path, intermediate tables being created as needed
    pub fn set<T: AsRef<str>, V: Into<toml::Value>>(&mut self, k: T, v: V) {
        let keys: Vec<&str> = k.as_ref().split('.').collect();
        let mut item = &mut self.value;
        for key in &keys[..keys.len() - 1] {
            let table = match item.as_table_mut() {
                Some(t) => t,
                None => return,
            };
            item = table
                .entry((*key).to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }
        if let (Some(table), Some(last)) = (item.as_table_mut(), keys.last()) {
            table.insert((*last).to_string(), v.into());
        }
    }

    /// Load configuration from input object. If keys are already present, they are overwritten
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::Value::from_str(&s) {
            Ok(value) => {
                self.value = value;
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "Load configuration failed",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn config_get_path() {
        let mut config = Config::default();
        config
            .load_config(&b"[tshark]\npath = \"/usr/bin/tshark\"\n"[..])
            .unwrap();
        assert_eq!(config.get("tshark.path"), Some("/usr/bin/tshark"));
        assert_eq!(config.get("tshark.missing"), None);
    }

    #[test]
    fn config_set_path() {
        let mut config = Config::default();
        config.set("num_threads", 4_i64);
        config.set("tshark.path", "tshark");
        assert_eq!(config.get_usize("num_threads"), Some(4));
        assert_eq!(config.get("tshark.path"), Some("tshark"));
    }
}
