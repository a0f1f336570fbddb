use serde::{Deserialize, Serialize};

/// Kind of a tree entry.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One entry of the project tree.
///
/// Files carry `content` and no `children`; folders carry `children` and no
/// `content`. Children keep creation order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileTreeNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileTreeNode>>,
}

impl FileTreeNode {
    pub fn file(name: &str, path: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: NodeKind::File,
            content: Some(content.to_string()),
            children: None,
        }
    }

    pub fn folder(name: &str, path: &str, children: Vec<FileTreeNode>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind: NodeKind::Folder,
            content: None,
            children: Some(children),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Children of a folder; empty for files.
    pub fn children(&self) -> &[FileTreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// The project tree: an ordered forest of top-level entries.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FileTree {
    pub nodes: Vec<FileTreeNode>,
}

impl FileTree {
    pub fn new(nodes: Vec<FileTreeNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by its absolute path.
    pub fn find(&self, path: &str) -> Option<&FileTreeNode> {
        find_in(&self.nodes, path)
    }

    /// Paths of every file, depth first in stored order.
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_file_paths(&self.nodes, &mut paths);
        paths
    }

    /// Number of file nodes in the whole tree.
    pub fn file_count(&self) -> usize {
        count_files(&self.nodes)
    }
}

fn find_in<'a>(nodes: &'a [FileTreeNode], path: &str) -> Option<&'a FileTreeNode> {
    for node in nodes {
        if node.path == path {
            return Some(node);
        }
        if let Some(found) = find_in(node.children(), path) {
            return Some(found);
        }
    }
    None
}

fn collect_file_paths(nodes: &[FileTreeNode], paths: &mut Vec<String>) {
    for node in nodes {
        if node.is_file() {
            paths.push(node.path.clone());
        } else {
            collect_file_paths(node.children(), paths);
        }
    }
}

fn count_files(nodes: &[FileTreeNode]) -> usize {
    nodes
        .iter()
        .map(|node| {
            if node.is_file() {
                1
            } else {
                count_files(node.children())
            }
        })
        .sum()
}

const APP_TSX: &str = r#"import React from 'react';

export default function App() {
  return (
    <div className="flex items-center justify-center min-h-screen bg-gradient-to-br from-blue-500 to-purple-600">
      <div className="text-center">
        <h1 className="text-4xl font-bold text-white mb-4">Welcome to Your App</h1>
        <p className="text-xl text-blue-100">Start prompting to generate your next feature</p>
      </div>
    </div>
  );
}"#;

const MAIN_TSX: &str = r#"import React from 'react';
import ReactDOM from 'react-dom/client';
import App from './App';
import './index.css';

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>,
);"#;

const INDEX_CSS: &str = r#"@tailwind base;
@tailwind components;
@tailwind utilities;

body {
  margin: 0;
  padding: 0;
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif;
}"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Generated App</title>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/src/main.tsx"></script>
  </body>
</html>"#;

const PACKAGE_JSON: &str = r#"{
  "name": "generated-app",
  "version": "0.0.0",
  "type": "module",
  "scripts": {
    "dev": "vite",
    "build": "vite build",
    "preview": "vite preview"
  },
  "dependencies": {
    "react": "^18.3.1",
    "react-dom": "^18.3.1",
    "react-router-dom": "^6.20.0",
    "lucide-react": "^0.344.0",
    "axios": "^1.7.0"
  },
  "devDependencies": {
    "@types/react": "^18.2.48",
    "@types/react-dom": "^18.2.18",
    "@vitejs/plugin-react": "^4.2.1",
    "typescript": "^5.3.3",
    "vite": "^5.0.8",
    "autoprefixer": "^10.4.17",
    "postcss": "^8.4.32",
    "tailwindcss": "^3.4.1"
  }
}"#;

const VITE_CONFIG: &str = r#"import { defineConfig } from 'vite'
import react from '@vitejs/plugin-react'

export default defineConfig({
  plugins: [react()],
})"#;

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2020",
    "useDefineForClassFields": true,
    "lib": ["ES2020", "DOM", "DOM.Iterable"],
    "module": "ESNext",
    "skipLibCheck": true,
    "esModuleInterop": true,
    "allowSyntheticDefaultImports": true,
    "strict": true,
    "noEmit": true,
    "moduleResolution": "bundler",
    "resolveJsonModule": true,
    "noImplicitAny": false
  },
  "include": ["src"],
  "references": [{ "path": "./tsconfig.node.json" }]
}"#;

const TSCONFIG_NODE: &str = r#"{
  "compilerOptions": {
    "composite": true,
    "skipLibCheck": true,
    "module": "ESNext",
    "moduleResolution": "bundler",
    "allowSyntheticDefaultImports": true
  },
  "include": ["vite.config.ts"]
}"#;

const POSTCSS_CONFIG: &str = r#"export default {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
export default {
  content: ['./index.html', './src/**/*.{js,ts,jsx,tsx}'],
  theme: {
    extend: {},
  },
  plugins: [],
}"#;

/// Starter Vite + React + Tailwind project every session begins from.
pub fn boilerplate_tree() -> FileTree {
    FileTree::new(vec![
        FileTreeNode::folder(
            "src",
            "/src",
            vec![
                FileTreeNode::file("App.tsx", "/src/App.tsx", APP_TSX),
                FileTreeNode::file("main.tsx", "/src/main.tsx", MAIN_TSX),
                FileTreeNode::file("index.css", "/src/index.css", INDEX_CSS),
                FileTreeNode::file(
                    "vite-env.d.ts",
                    "/src/vite-env.d.ts",
                    "/// <reference types=\"vite/client\" />",
                ),
            ],
        ),
        FileTreeNode::file("index.html", "/index.html", INDEX_HTML),
        FileTreeNode::file("package.json", "/package.json", PACKAGE_JSON),
        FileTreeNode::file("vite.config.ts", "/vite.config.ts", VITE_CONFIG),
        FileTreeNode::file("tsconfig.json", "/tsconfig.json", TSCONFIG),
        FileTreeNode::file("tsconfig.node.json", "/tsconfig.node.json", TSCONFIG_NODE),
        FileTreeNode::file("postcss.config.js", "/postcss.config.js", POSTCSS_CONFIG),
        FileTreeNode::file("tailwind.config.js", "/tailwind.config.js", TAILWIND_CONFIG),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag_and_omits_absent_fields() {
        let tree = FileTree::new(vec![FileTreeNode::folder(
            "src",
            "/src",
            vec![FileTreeNode::file("a.ts", "/src/a.ts", "x")],
        )]);
        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([{
                "name": "src",
                "path": "/src",
                "type": "folder",
                "children": [
                    { "name": "a.ts", "path": "/src/a.ts", "type": "file", "content": "x" }
                ]
            }])
        );
    }

    #[test]
    fn find_descends_into_folders() {
        let tree = boilerplate_tree();
        let node = tree.find("/src/main.tsx").expect("main.tsx");
        assert!(node.is_file());
        assert!(tree.find("/src/missing.tsx").is_none());
    }

    #[test]
    fn boilerplate_counts_files() {
        assert_eq!(boilerplate_tree().file_count(), 12);
    }
}
