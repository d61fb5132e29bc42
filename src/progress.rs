use log::info;

/// Percentage reporter for long enumerations.  Purely cosmetic.
pub struct Progress {
    what: &'static str,
    total: usize,
    done: usize,
}

impl Progress {
    pub fn new(what: &'static str, total: usize) -> Self {
        info!("Reading {total} {what}.");
        Self {
            what,
            total,
            done: 0,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.done as f64 * 100.0 / self.total as f64
        }
    }

    pub fn item_done(&mut self) {
        self.done = (self.done + 1).min(self.total);
        info!("{}: {:.2}%", self.what, self.percentage());
    }
}

#[cfg(test)]
mod tests {
    use super::Progress;

    #[test]
    fn percentage_is_capped() {
        let mut progress = Progress::new("weeks", 3);
        assert_eq!(progress.percentage(), 0.0);
        progress.item_done();
        assert_eq!(format!("{:.2}", progress.percentage()), "33.33");
        for _ in 0..5 {
            progress.item_done();
        }
        assert_eq!(progress.percentage(), 100.0);
        assert_eq!(Progress::new("fixtures", 0).percentage(), 100.0);
    }
}
