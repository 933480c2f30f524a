//! Terminal adjudication: variants are written as PNGs and the operator picks
//! one by number.

use std::{
    io::{self, BufRead, Cursor, Write},
    path::{Path, PathBuf},
};

use cardsheet_core::{Presenter, SKIP_CHOICE, Variant};
use log::debug;
use tempfile::TempDir;

/// Index offered as the default answer: the plain crop.
const DEFAULT_CHOICE: usize = 1;

/// Where operator answers come from, one line at a time.
///
/// Standard input is locked only for the duration of each read, so other
/// prompts can share it.
pub trait LineSource {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize>;
}

impl LineSource for io::Stdin {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        io::Stdin::read_line(self, buf)
    }
}

impl<T: AsRef<[u8]>> LineSource for Cursor<T> {
    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        BufRead::read_line(self, buf)
    }
}

pub struct TerminalPresenter<R, W> {
    dir: TempDir,
    input: R,
    output: W,
    round: usize,
}

impl TerminalPresenter<io::Stdin, io::Stdout> {
    /// Presenter reading from stdin and writing to stdout.
    pub fn stdio() -> io::Result<Self> {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R: LineSource, W: Write> TerminalPresenter<R, W> {
    pub fn new(input: R, output: W) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("cardsheet-").tempdir()?;
        Ok(Self {
            dir,
            input,
            output,
            round: 0,
        })
    }

    /// Folder the variant images are written to.
    pub fn image_dir(&self) -> &Path {
        self.dir.path()
    }

    fn save_variant(&self, index: usize, variant: &Variant) -> io::Result<PathBuf> {
        let path = self
            .dir
            .path()
            .join(format!("photo{:03}-variant{index}.png", self.round));
        variant.image.save(&path).map_err(io::Error::other)?;
        Ok(path)
    }
}

impl<R: LineSource, W: Write> Presenter for TerminalPresenter<R, W> {
    fn choose(&mut self, variants: &[Variant]) -> io::Result<Option<usize>> {
        self.round += 1;
        for (index, variant) in variants.iter().enumerate() {
            let path = self.save_variant(index, variant)?;
            debug!("variant {index} written to {}", path.display());
            writeln!(self.output, "[{index}] {}: {}", variant.label, path.display())?;
        }
        writeln!(self.output, "[{SKIP_CHOICE}] skip this photo")?;
        write!(self.output, "Which image should be used? [{DEFAULT_CHOICE}]: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no answer on standard input",
            ));
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(Some(DEFAULT_CHOICE));
        }
        Ok(answer.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn variants() -> Vec<Variant> {
        ["original", "crop"]
            .iter()
            .map(|label| Variant {
                label: label.to_string(),
                image: RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])),
            })
            .collect()
    }

    fn answer(input: &str) -> (io::Result<Option<usize>>, String) {
        let mut out = Vec::new();
        let result = {
            let mut presenter = TerminalPresenter::new(Cursor::new(input.to_string()), &mut out)
                .expect("presenter");
            presenter.choose(&variants())
        };
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn lists_variants_with_their_files() {
        let (result, shown) = answer("0\n");
        assert_eq!(result.unwrap(), Some(0));
        assert!(shown.contains("[0] original: "));
        assert!(shown.contains("[1] crop: "));
        assert!(shown.contains(&format!("[{SKIP_CHOICE}] skip this photo")));
    }

    #[test]
    fn variant_images_exist_while_presenting() {
        let mut presenter =
            TerminalPresenter::new(Cursor::new("1\n"), Vec::new()).expect("presenter");
        presenter.choose(&variants()).unwrap();
        let written = std::fs::read_dir(presenter.image_dir()).unwrap().count();
        assert_eq!(written, 2);
    }

    #[test]
    fn empty_answer_is_the_crop_and_garbage_is_none() {
        assert_eq!(answer("\n").0.unwrap(), Some(DEFAULT_CHOICE));
        assert_eq!(answer("six\n").0.unwrap(), None);
        assert_eq!(answer("6\n").0.unwrap(), Some(SKIP_CHOICE));
    }

    #[test]
    fn closed_input_is_an_error() {
        assert!(answer("").0.is_err());
    }
}
