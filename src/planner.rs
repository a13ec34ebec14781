//! Planificación de pares (entrada, salida) para un lote.
//!
//! El recorrido es perezoso y determinista: dentro de cada directorio las
//! entradas se ordenan por nombre, de modo que dos ejecuciones sobre el mismo
//! árbol producen la misma secuencia y los mismos sufijos `_clean_N`.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

use crate::config::ScrubOptions;

/// Par planificado: archivo de entrada y ruta final de su copia limpia.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedPair {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Elemento del plan. Las entradas ilegibles también se entregan para que el
/// orquestador las registre.
#[derive(Debug)]
pub enum PlanEntry {
    Pair(PlannedPair),
    Unreadable { path: PathBuf, error: io::Error },
}

impl PlanEntry {
    pub fn input_path(&self) -> &Path {
        match self {
            PlanEntry::Pair(pair) => &pair.input,
            PlanEntry::Unreadable { path, .. } => path,
        }
    }
}

/// Calcula la secuencia de trabajo para una raíz y un directorio de salida.
#[derive(Clone, Debug)]
pub struct PathPlanner {
    root: PathBuf,
    out_dir: PathBuf,
    recursive: bool,
    keep_structure: bool,
    overwrite: bool,
}

impl PathPlanner {
    pub fn new(root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, options: &ScrubOptions) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            recursive: options.recursive,
            keep_structure: options.keep_structure,
            overwrite: options.overwrite,
        }
    }

    /// Inicia un recorrido nuevo con su propio registro de rutas reservadas.
    pub fn plan(&self) -> Plan {
        let source = if self.root.is_dir() {
            let max_depth = if self.recursive { usize::MAX } else { 1 };
            let out_dir = self.out_dir.clone();
            let resolved_out = fs::canonicalize(&self.out_dir).ok();
            // Un directorio de salida dentro de la raíz no se vuelve a recorrer.
            let walker = WalkDir::new(&self.root)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |entry| {
                    !entry.file_type().is_dir()
                        || !is_output_dir(entry.path(), &out_dir, resolved_out.as_deref())
                });
            PlanSource::Walk(Box::new(walker))
        } else {
            PlanSource::Single(Some(self.root.clone()))
        };

        Plan {
            planner: self.clone(),
            source,
            reservations: OutputReservations::default(),
        }
    }

    fn output_for(&self, input: &Path) -> PathBuf {
        let file_name = input
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();

        if self.keep_structure {
            let relative = input
                .strip_prefix(&self.root)
                .ok()
                .filter(|relative| !relative.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(&file_name));
            self.out_dir.join(relative)
        } else {
            self.out_dir.join(file_name)
        }
    }
}

enum PlanSource {
    Single(Option<PathBuf>),
    Walk(Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>),
}

/// Secuencia perezosa y finita; se consume una vez por lote.
pub struct Plan {
    planner: PathPlanner,
    source: PlanSource,
    reservations: OutputReservations,
}

impl Plan {
    fn pair_for(&mut self, input: PathBuf) -> PlanEntry {
        let candidate = self.planner.output_for(&input);
        let output = self.reservations.reserve(candidate, self.planner.overwrite);
        PlanEntry::Pair(PlannedPair { input, output })
    }
}

impl Iterator for Plan {
    type Item = PlanEntry;

    fn next(&mut self) -> Option<PlanEntry> {
        loop {
            let next = match &mut self.source {
                PlanSource::Single(path) => path.take().map(Ok),
                PlanSource::Walk(walker) => walker.next().map(|entry| match entry {
                    Ok(entry) if entry.file_type().is_dir() => Err(None),
                    Ok(entry) => Ok(entry.into_path()),
                    Err(error) => Err(Some(walk_failure(error, &self.planner.root))),
                }),
            }?;

            match next {
                Ok(input) => return Some(self.pair_for(input)),
                Err(Some(failure)) => return Some(failure),
                // Los directorios solo se recorren, no se planifican.
                Err(None) => continue,
            }
        }
    }
}

fn is_output_dir(path: &Path, out_dir: &Path, resolved_out: Option<&Path>) -> bool {
    if path == out_dir {
        return true;
    }
    match resolved_out {
        Some(resolved_out) => fs::canonicalize(path).is_ok_and(|path| path == resolved_out),
        None => false,
    }
}

fn walk_failure(error: walkdir::Error, root: &Path) -> PlanEntry {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let message = error.to_string();
    let error = error
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    PlanEntry::Unreadable { path, error }
}

/// Rutas de salida ya asignadas en este lote.
#[derive(Debug, Default)]
pub struct OutputReservations {
    taken: HashSet<PathBuf>,
}

impl OutputReservations {
    /// Devuelve la ruta definitiva para `candidate` y la reserva en el mismo paso.
    pub fn reserve(&mut self, candidate: PathBuf, overwrite: bool) -> PathBuf {
        if overwrite || !self.is_taken(&candidate) {
            self.taken.insert(candidate.clone());
            return candidate;
        }

        let mut counter = 1_u64;
        loop {
            let suffixed = with_clean_suffix(&candidate, counter);
            if !self.is_taken(&suffixed) {
                trace!(
                    candidate = %candidate.display(),
                    chosen = %suffixed.display(),
                    "output collision resolved"
                );
                self.taken.insert(suffixed.clone());
                return suffixed;
            }
            counter += 1;
        }
    }

    fn is_taken(&self, path: &Path) -> bool {
        // Si no se puede comprobar, la promoción sin reemplazo detectará el conflicto.
        self.taken.contains(path) || path.try_exists().unwrap_or(false)
    }
}

/// `foto.jpg` -> `foto_clean_N.jpg`; sin extensión -> `nombre_clean_N`.
pub fn with_clean_suffix(path: &Path, counter: u64) -> PathBuf {
    let mut name = path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(format!("_clean_{counter}"));
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    path.with_file_name(name)
}
