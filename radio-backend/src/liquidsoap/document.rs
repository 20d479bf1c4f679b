//! In-progress engine program and the priority-ordered section list that fills it

/// Lines of a generated program: a prepended header followed by the body
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    header: Vec<String>,
    body: Vec<String>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        lines.append(&mut self.header);
        self.header = lines;
    }

    pub fn append_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.extend(lines.into_iter().map(Into::into));
    }

    pub fn append_line(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    pub fn body(&self) -> &[String] {
        &self.body
    }

    /// Final program text, newline-terminated
    pub fn build(&self) -> String {
        let mut out = String::new();
        for line in self.header.iter().chain(self.body.iter()) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// One contributor to the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Runtime settings and the callback functions
    Header,
    /// Playlist sources and the scheduling graph
    Playlists,
    /// Live DJ input
    Harbor,
    /// Crossfade, metadata and gain wrappers plus the station's raw snippet
    Custom,
    LocalBroadcasts,
    RemoteBroadcasts,
}

impl Section {
    /// Later sections reference variables defined by earlier ones, so these
    /// priorities are part of the program's correctness.
    pub fn default_priority(self) -> i32 {
        match self {
            Section::Header => 25,
            Section::Playlists => 20,
            Section::Harbor => 15,
            Section::Custom => 10,
            Section::LocalBroadcasts => 5,
            Section::RemoteBroadcasts => 0,
        }
    }
}

/// Sections sorted by descending priority; equal priorities keep registration order
#[derive(Debug, Clone, Default)]
pub struct SectionPipeline {
    sections: Vec<(i32, Section)>,
}

impl SectionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every standard section at its default priority
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        for section in [
            Section::Header,
            Section::Playlists,
            Section::Harbor,
            Section::Custom,
            Section::LocalBroadcasts,
            Section::RemoteBroadcasts,
        ] {
            pipeline.register(section.default_priority(), section);
        }
        pipeline
    }

    pub fn register(&mut self, priority: i32, section: Section) {
        let index = self
            .sections
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.sections.len());
        self.sections.insert(index, (priority, section));
    }

    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.iter().map(|(_, s)| *s)
    }

    /// The section allowed to prepend the file header
    pub fn first(&self) -> Option<Section> {
        self.sections.first().map(|(_, s)| *s)
    }
}
