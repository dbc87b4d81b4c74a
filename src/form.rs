//! In-memory model of the request form: the `module-list` container, the
//! `nickname` and `expires` inputs, and form reset.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOption {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleList {
    options: Vec<ModuleOption>,
}

impl ModuleList {
    pub fn options(&self) -> &[ModuleOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn clear(&mut self) {
        self.options.clear();
    }

    /// Appends one unchecked option labelled with its value.
    pub fn append(&mut self, kind: &str) {
        self.options.push(ModuleOption {
            value: kind.to_string(),
            label: kind.to_string(),
            checked: false,
        });
    }

    /// Returns false when no option carries `value`.
    pub fn set_checked(&mut self, value: &str, checked: bool) -> bool {
        match self.options.iter_mut().find(|o| o.value == value) {
            Some(option) => {
                option.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Returns false when `index` is out of range.
    pub fn set_checked_at(&mut self, index: usize, checked: bool) -> bool {
        match self.options.get_mut(index) {
            Some(option) => {
                option.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn uncheck_all(&mut self) {
        for option in &mut self.options {
            option.checked = false;
        }
    }

    /// Checked values in list order.
    pub fn selected(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.checked)
            .map(|o| o.value.clone())
            .collect()
    }
}

/// Values read from the form when it is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub nickname: String,
    pub expires_days: i64,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestForm {
    pub nickname: String,
    pub expires_days: i64,
    pub modules: ModuleList,
    default_expires_days: i64,
}

impl RequestForm {
    pub fn new(default_expires_days: i64) -> Self {
        Self {
            nickname: String::new(),
            expires_days: default_expires_days,
            modules: ModuleList::default(),
            default_expires_days,
        }
    }

    pub fn submission(&self) -> FormSubmission {
        FormSubmission {
            nickname: self.nickname.clone(),
            expires_days: self.expires_days,
            modules: self.modules.selected(),
        }
    }

    /// Restores the inputs to their initial values and unchecks every module.
    pub fn reset(&mut self) {
        self.nickname.clear();
        self.expires_days = self.default_expires_days;
        self.modules.uncheck_all();
    }
}
