use log::warn;
use rand::seq::IndexedRandom;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const VALID_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Built-in alias table: canonical name -> full names, short names and
/// abbreviations players are allowed to answer with.
const BUILTIN_CHARACTERS: &[(&str, &[&str])] = &[
    // Virtual singers
    ("初音ミク", &["miku", "初音", "ミク", "葱娘", "haku"]),
    ("鏡音リン", &["rin", "镜音铃", "リン", "镜音"]),
    ("鏡音レン", &["len", "镜音连", "レン"]),
    ("巡音ルカ", &["luka", "巡音", "ルカ"]),
    // 25-ji, Nightcord de.
    ("宵崎奏", &["kanade", "奏"]),
    ("朝比奈まふゆ", &["mafuyu", "朝比奈", "まふゆ", "mfy"]),
    ("東雲絵名", &["ena", "东云绘名", "絵名", "绘名"]),
    ("暁山瑞希", &["mizuki", "晓山瑞希", "瑞希", "みずき"]),
    // Wonderlands x Showtime
    ("草薙寧々", &["nene", "草薙宁宁", "宁宁", "寧々"]),
    ("神代類", &["rui", "神代类", "類", "类"]),
    ("鳳えむ", &["emu", "凤绘梦", "えむ", "绘梦"]),
    ("天馬司", &["tsukasa", "天马司", "司"]),
    // Leo/need
    ("星乃一歌", &["ichika", "星乃一歌", "一歌"]),
    ("日野森志歩", &["shiho", "日野森志步", "志步", "志歩"]),
    ("天馬咲希", &["saki", "天马咲希", "咲希"]),
    ("望月穂波", &["honami", "望月穗波", "穂波", "穗波"]),
    // Vivid BAD SQUAD
    ("小豆沢こはね", &["kohane", "小豆沢心羽", "心羽"]),
    ("東雲彰人", &["akito", "东云彰人", "彰人"]),
    ("青柳冬弥", &["toya", "青柳冬弥", "冬弥"]),
    ("白石杏", &["an", "白石杏", "杏"]),
];

/// Lower-cases and strips spaces/underscores so that file stems, aliases and
/// user guesses all compare the same way.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '_'], "")
}

/// One randomly drawn challenge: the character, one of its portraits and
/// every answer the round will accept.
pub struct Pick {
    pub character: String,
    pub image_path: PathBuf,
    pub answers: HashSet<String>,
}

pub struct Catalog {
    /// canonical name -> portrait files
    images: HashMap<String, Vec<PathBuf>>,
    /// normalized alias (or canonical name) -> canonical name
    aliases: HashMap<String, String>,
}

impl Catalog {
    /// Scans `dir` for character portraits. File stems have a trailing
    /// numbering stripped ("miku01" -> "miku") and are matched against the
    /// alias table; unmatched stems become ad-hoc characters so a stray file
    /// still produces a playable round.
    pub fn load(dir: &Path, extra_aliases: &HashMap<String, Vec<String>>) -> Catalog {
        let aliases = build_alias_index(extra_aliases);
        let mut images: HashMap<String, Vec<PathBuf>> = HashMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("image directory {} not readable: {}", dir.display(), e);
                return Catalog { images, aliases };
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            if !ext.is_some_and(|e| VALID_EXTENSIONS.contains(&e.as_str())) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let mut clean = stem.trim_end_matches(|c: char| c.is_ascii_digit());
            if clean.is_empty() {
                clean = stem;
            }

            let canonical = match aliases.get(&normalize(clean)) {
                Some(name) => name.clone(),
                None => {
                    warn!("no character match for file {}, using stem as name", stem);
                    clean.to_string()
                }
            };

            images.entry(canonical).or_default().push(path);
        }

        Catalog { images, aliases }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn character_count(&self) -> usize {
        self.images.len()
    }

    /// Draws a random character and one of its portraits. `None` when no
    /// images were loaded.
    pub fn pick_random(&self) -> Option<Pick> {
        let mut rng = rand::rng();
        let names: Vec<&String> = self.images.keys().collect();
        let character = (*names.choose(&mut rng)?).clone();
        let image_path = self.images.get(&character)?.choose(&mut rng)?.clone();
        let answers = self.answers_for(&character);
        Some(Pick {
            character,
            image_path,
            answers,
        })
    }

    /// The accepted-answer set for a character: its own name plus every alias
    /// that maps to it, all normalized.
    pub fn answers_for(&self, character: &str) -> HashSet<String> {
        let mut answers: HashSet<String> = self
            .aliases
            .iter()
            .filter(|(_, canonical)| canonical.as_str() == character)
            .map(|(alias, _)| alias.clone())
            .collect();
        answers.insert(normalize(character));
        answers
    }
}

fn build_alias_index(extra_aliases: &HashMap<String, Vec<String>>) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for (canonical, aliases) in BUILTIN_CHARACTERS {
        index.insert(normalize(canonical), canonical.to_string());
        for alias in *aliases {
            index.insert(normalize(alias), canonical.to_string());
        }
    }
    for (canonical, aliases) in extra_aliases {
        index.insert(normalize(canonical), canonical.clone());
        for alias in aliases {
            index.insert(normalize(alias), canonical.clone());
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> Result<()> {
        fs::write(dir.join(name), b"stub")?;
        Ok(())
    }

    #[test]
    fn filenames_map_to_canonical_characters() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "miku01.png")?;
        touch(dir.path(), "miku02.jpg")?;
        touch(dir.path(), "kanade.jpeg")?;
        touch(dir.path(), "notes.txt")?;

        let catalog = Catalog::load(dir.path(), &HashMap::new());
        assert_eq!(catalog.character_count(), 2);
        assert_eq!(catalog.images.get("初音ミク").map(Vec::len), Some(2));
        assert_eq!(catalog.images.get("宵崎奏").map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn unmatched_stem_becomes_adhoc_character() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "mysteryhero3.bmp")?;

        let catalog = Catalog::load(dir.path(), &HashMap::new());
        assert!(catalog.images.contains_key("mysteryhero"));
        assert!(catalog
            .answers_for("mysteryhero")
            .contains("mysteryhero"));
        Ok(())
    }

    #[test]
    fn missing_directory_yields_empty_catalog() {
        let catalog = Catalog::load(Path::new("/no/such/dir"), &HashMap::new());
        assert!(catalog.is_empty());
        assert!(catalog.pick_random().is_none());
    }

    #[test]
    fn answers_include_all_aliases_normalized() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "miku1.png")?;

        let catalog = Catalog::load(dir.path(), &HashMap::new());
        let answers = catalog.answers_for("初音ミク");
        assert!(answers.contains("miku"));
        assert!(answers.contains("初音"));
        assert!(answers.contains("葱娘"));
        assert!(answers.contains("初音ミク"));
        Ok(())
    }

    #[test]
    fn extra_aliases_extend_the_table() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "knd.png")?;

        let mut extra = HashMap::new();
        extra.insert("宵崎奏".to_string(), vec!["KND".to_string()]);

        let catalog = Catalog::load(dir.path(), &extra);
        assert_eq!(catalog.images.get("宵崎奏").map(Vec::len), Some(1));
        assert!(catalog.answers_for("宵崎奏").contains("knd"));
        Ok(())
    }

    #[test]
    fn pick_random_returns_some_with_images() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(dir.path(), "miku1.png")?;

        let catalog = Catalog::load(dir.path(), &HashMap::new());
        let pick = catalog.pick_random().expect("catalog not empty");
        assert_eq!(pick.character, "初音ミク");
        assert!(pick.answers.contains("miku"));
        assert!(pick.image_path.ends_with("miku1.png"));
        Ok(())
    }

    #[test]
    fn normalize_strips_case_spaces_and_underscores() {
        assert_eq!(normalize("  Hatsune_Miku "), "hatsunemiku");
        assert_eq!(normalize("MIKU"), "miku");
    }
}
