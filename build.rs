const KB_FILES: &[&str] = &[
    "kbs/domains.kb",
    "kbs/boilerplate.kb",
    "kbs/title-fragments.kb",
    "kbs/name-particles.kb",
    "kbs/honorifics.kb",
];

fn main() {
    // include_str! embeds these in kb.rs; cargo doesn't track them on its own.
    for kb in KB_FILES {
        println!("cargo::rerun-if-changed={kb}");
    }
    let hash = kb_hash();
    println!("cargo::rustc-env=KB_HASH={hash}");
}

fn kb_hash() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    for kb in KB_FILES {
        if let Ok(contents) = std::fs::read_to_string(kb) {
            contents.hash(&mut hasher);
        }
    }
    hasher.finish()
}
