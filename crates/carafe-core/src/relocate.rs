//! Script path rebasing after an environment move.
//!
//! Console scripts installed by pip embed the environment's absolute
//! interpreter path in their shebang line. Environments are populated in a
//! staging directory and renamed into place, so after the move every script
//! still points at the (now gone) staging path. This module rewrites those
//! shebangs to the committed location, making the renamed environment
//! functional. `pyvenv.cfg` and the `bin/python` symlinks reference the base
//! interpreter, not the environment, and survive the move untouched.

use std::io;
use std::path::Path;

/// Rewrite shebang references to `old_root` in every script under the
/// environment's `bin/` directory, returning how many scripts were updated.
///
/// Non-text files (the interpreter symlinks, compiled launchers) are left
/// alone.
///
/// # Errors
///
/// Returns an I/O error if the bin directory cannot be read or a script
/// cannot be rewritten.
pub fn rebase_scripts(env_root: &Path, old_root: &Path, new_root: &Path) -> io::Result<usize> {
    let bin_dir = env_root.join("bin");
    let old = old_root.to_string_lossy();
    let new = new_root.to_string_lossy();

    let mut updated = 0;
    for entry in std::fs::read_dir(&bin_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }

        let bytes = std::fs::read(&path)?;
        if !bytes.starts_with(b"#!") {
            continue;
        }
        let Ok(content) = String::from_utf8(bytes) else {
            continue;
        };
        if !content.contains(old.as_ref()) {
            continue;
        }

        let rewritten = content.replace(old.as_ref(), new.as_ref());
        let perms = std::fs::metadata(&path)?.permissions();
        std::fs::write(&path, rewritten)?;
        std::fs::set_permissions(&path, perms)?;
        updated += 1;
        tracing::trace!(script = %path.display(), "rebased shebang");
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_shebang_to_new_root() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("staged");
        std::fs::create_dir_all(staged.join("bin")).unwrap();
        std::fs::write(
            staged.join("bin/pixeldojo-mcp"),
            format!(
                "#!{}/bin/python\nimport sys\nsys.exit(0)\n",
                staged.display()
            ),
        )
        .unwrap();

        let committed = dir.path().join("envs/pixeldojo-mcp");
        std::fs::create_dir_all(committed.parent().unwrap()).unwrap();
        std::fs::rename(&staged, &committed).unwrap();

        let updated = rebase_scripts(&committed, &staged, &committed).unwrap();
        assert_eq!(updated, 1);

        let content = std::fs::read_to_string(committed.join("bin/pixeldojo-mcp")).unwrap();
        assert!(content.starts_with(&format!("#!{}/bin/python", committed.display())));
        assert!(!content.contains(&staged.display().to_string()));
    }

    #[test]
    fn leaves_unrelated_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("env");
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin/activate"), "# no shebang here\n").unwrap();

        let updated = rebase_scripts(&root, Path::new("/stage"), &root).unwrap();
        assert_eq!(updated, 0);
    }
}
