use crate::vfs::VirtualFS;
use colored::Colorize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Represents a node in the tree (either file or directory).
#[derive(Debug)]
struct TreeNode {
    name: String,
    children: Vec<Rc<RefCell<TreeNode>>>,
    is_file: bool,
}
impl TreeNode {
    fn new(name: String, is_file: bool) -> Self {
        Self {
            name,
            children: Vec::new(),
            is_file,
        }
    }
}

/// Returns the node for `relative`, creating it and any missing parent directories.
fn find_or_insert(
    lookup: &mut HashMap<PathBuf, Rc<RefCell<TreeNode>>>,
    relative: &Path,
    is_file: bool,
) -> Rc<RefCell<TreeNode>> {
    if let Some(node) = lookup.get(relative) {
        return Rc::clone(node);
    }

    let parent_path = relative.parent().unwrap_or_else(|| Path::new(""));
    let parent_node = find_or_insert(lookup, parent_path, false);

    let child_name = relative
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| relative.display().to_string());

    let child = Rc::new(RefCell::new(TreeNode::new(child_name, is_file)));

    parent_node.borrow_mut().children.push(Rc::clone(&child));

    lookup.insert(relative.to_path_buf(), Rc::clone(&child));

    child
}

/// Build the directory tree from the VFS entries, returning the root node.
fn build_tree(vfs: &VirtualFS, destination: &Path) -> Rc<RefCell<TreeNode>> {
    let root_name = destination
        .file_name()
        .map(|os| os.to_string_lossy().to_string())
        .unwrap_or_else(|| destination.display().to_string());

    let root = Rc::new(RefCell::new(TreeNode::new(root_name, false)));

    // relative path to node, the root is the empty path
    let mut lookup: HashMap<PathBuf, Rc<RefCell<TreeNode>>> = HashMap::new();
    lookup.insert(PathBuf::new(), Rc::clone(&root));

    for entry in &vfs.entries {
        find_or_insert(&mut lookup, &entry.destination, entry.is_file);
    }

    root
}

/// Write the tree with a nice ASCII style.
fn write_tree(out: &mut String, node: &Rc<RefCell<TreeNode>>, prefix: &str, is_last: bool) {
    let node_borrow = node.borrow();

    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };
    let name = if node_borrow.is_file {
        node_borrow.name.green()
    } else {
        node_borrow.name.blue()
    };
    let _ = writeln!(out, "{}{}{}", prefix.yellow(), connector, name);

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let len = node_borrow.children.len();
    for (i, child) in node_borrow.children.iter().enumerate() {
        let last = i == len - 1;
        write_tree(out, child, &child_prefix, last);
    }
}

/// Renders the staged entries as a tree rooted at `destination`.
pub fn render_tree(vfs: &VirtualFS, destination: &Path) -> String {
    let tree_root = build_tree(vfs, destination);
    let mut out = String::new();

    write_tree(&mut out, &tree_root, "", true);

    out
}

pub fn preview_as_tree(vfs: &VirtualFS, destination: &Path, ask_confirmation: bool) {
    println!(
        "Legend: {} = (directory), {} = (file)",
        "blue".blue(),
        "green".green()
    );

    let fancy_prompt = format!(
        "{} {}\n",
        "┌─".bold().bright_blue(),
        "Preview".bold().bright_blue(),
    );

    println!("{}", fancy_prompt);

    print!("{}", render_tree(vfs, destination));

    if ask_confirmation {
        let fancy_prompt = format!(
            "\n\n{} {}\n",
            "└─".bold().bright_blue(),
            "Press [y] to confirm or [n] to cancel".bright_green()
        );

        println!("{}", fancy_prompt);
    }
}
